//! Host token parsing and resolution against the agent inventory.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::MaintenanceError;

use super::types::MachineIdentity;

/// A host as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostToken {
    /// Inline `{"hostname": "...", "ip": "..."}` record, used for machines
    /// the master has never seen as agents.
    Literal(MachineIdentity),
    /// Hostname, IP address or agent id to look up.
    Token(String),
}

impl HostToken {
    /// Anything starting with `{` is an inline record and must contain
    /// exactly `hostname` and `ip` as strings. Everything else is a lookup
    /// token.
    pub fn parse(raw: &str) -> Result<Self, MaintenanceError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return Ok(HostToken::Token(trimmed.to_string()));
        }

        let malformed = || MaintenanceError::MalformedHost(raw.to_string());
        let record: serde_json::Map<String, Value> =
            serde_json::from_str(trimmed).map_err(|_| malformed())?;
        if record.len() != 2 {
            return Err(malformed());
        }
        match (
            record.get("hostname").and_then(Value::as_str),
            record.get("ip").and_then(Value::as_str),
        ) {
            (Some(hostname), Some(ip)) => Ok(HostToken::Literal(MachineIdentity::new(hostname, ip))),
            _ => Err(malformed()),
        }
    }
}

/// Lookup table of known machines.
///
/// Iteration order is registration order. When several machines share a
/// hostname, ip or agent id, the one registered first wins; both indexes
/// keep the lowest position for every key.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    machines: Vec<MachineIdentity>,
    by_token: HashMap<String, usize>,
    by_key: HashMap<(String, String), usize>,
}

impl Inventory {
    pub fn new(machines: impl IntoIterator<Item = MachineIdentity>) -> Self {
        let mut inventory = Self::default();
        inventory.extend(machines);
        inventory
    }

    /// Append machines after the existing ones.
    pub fn extend(&mut self, machines: impl IntoIterator<Item = MachineIdentity>) {
        for machine in machines {
            let position = self.machines.len();
            for token in [
                Some(machine.hostname()),
                Some(machine.ip()),
                machine.agent_id(),
            ]
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            {
                self.by_token.entry(token.to_string()).or_insert(position);
            }
            self.by_key
                .entry((machine.hostname().to_string(), machine.ip().to_string()))
                .or_insert(position);
            self.machines.push(machine);
        }
    }

    pub fn machines(&self) -> &[MachineIdentity] {
        &self.machines
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// First machine whose hostname, ip or agent id equals `token`.
    pub fn lookup(&self, token: &str) -> Option<&MachineIdentity> {
        self.by_token.get(token).map(|&i| &self.machines[i])
    }

    /// First machine equal to `identity`.
    pub fn find(&self, identity: &MachineIdentity) -> Option<&MachineIdentity> {
        self.by_key
            .get(&(identity.hostname().to_string(), identity.ip().to_string()))
            .map(|&i| &self.machines[i])
    }

    /// Resolve a token to a canonical identity without agent id.
    pub fn resolve(&self, token: &HostToken) -> Result<MachineIdentity, MaintenanceError> {
        match token {
            HostToken::Literal(identity) => Ok(identity.clone()),
            HostToken::Token(raw) => self
                .lookup(raw)
                .map(MachineIdentity::without_agent_id)
                .ok_or_else(|| MaintenanceError::Unresolved(raw.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Inventory {
        Inventory::new(vec![
            MachineIdentity::new("a", "10.0.0.1").with_agent_id("S1"),
            MachineIdentity::new("b", "10.0.0.2").with_agent_id("S2"),
            // shares an ip with `a`, registered later
            MachineIdentity::new("c", "10.0.0.1").with_agent_id("S3"),
        ])
    }

    #[test]
    fn parse_plain_token() {
        assert_eq!(
            HostToken::parse(" a.example ").unwrap(),
            HostToken::Token("a.example".into())
        );
    }

    #[test]
    fn parse_inline_record() {
        let token = HostToken::parse(r#"{"hostname": "x", "ip": "10.9.9.9"}"#).unwrap();
        assert_eq!(token, HostToken::Literal(MachineIdentity::new("x", "10.9.9.9")));
    }

    #[test]
    fn parse_rejects_extra_fields() {
        let err = HostToken::parse(r#"{"hostname": "x", "ip": "10.9.9.9", "id": "S1"}"#);
        assert!(matches!(err, Err(MaintenanceError::MalformedHost(_))));
    }

    #[test]
    fn parse_rejects_missing_ip() {
        let err = HostToken::parse(r#"{"hostname": "x", "id": "S1"}"#);
        assert!(matches!(err, Err(MaintenanceError::MalformedHost(_))));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        assert!(matches!(
            HostToken::parse("{hostname"),
            Err(MaintenanceError::MalformedHost(_))
        ));
    }

    #[test]
    fn resolve_by_each_field() {
        let inv = inventory();
        for token in ["a", "10.0.0.1", "S1"] {
            let id = inv.resolve(&HostToken::Token(token.into())).unwrap();
            assert_eq!(id, MachineIdentity::new("a", "10.0.0.1"));
            assert_eq!(id.agent_id(), None);
        }
    }

    #[test]
    fn first_registered_machine_wins() {
        let inv = inventory();
        let id = inv.resolve(&HostToken::Token("10.0.0.1".into())).unwrap();
        assert_eq!(id.hostname(), "a");
        let id = inv.resolve(&HostToken::Token("S3".into())).unwrap();
        assert_eq!(id.hostname(), "c");
    }

    #[test]
    fn unknown_token_is_unresolved() {
        let err = inventory().resolve(&HostToken::Token("10.0.0.5".into()));
        assert!(matches!(err, Err(MaintenanceError::Unresolved(t)) if t == "10.0.0.5"));
    }

    #[test]
    fn literal_bypasses_inventory() {
        let literal = MachineIdentity::new("ghost", "10.1.1.1");
        let id = Inventory::default()
            .resolve(&HostToken::Literal(literal.clone()))
            .unwrap();
        assert_eq!(id, literal);
    }

    #[test]
    fn empty_fields_never_match() {
        let inv = Inventory::new(vec![MachineIdentity::new("down-host", "")]);
        assert!(inv.lookup("").is_none());
        assert!(inv.lookup("down-host").is_some());
    }

    #[test]
    fn find_by_identity_keeps_first() {
        let inv = Inventory::new(vec![
            MachineIdentity::new("a", "10.0.0.1").with_agent_id("old"),
            MachineIdentity::new("a", "10.0.0.1").with_agent_id("new"),
        ]);
        let found = inv.find(&MachineIdentity::new("a", "10.0.0.1")).unwrap();
        assert_eq!(found.agent_id(), Some("old"));
    }
}
