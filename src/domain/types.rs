use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const NANOS_PER_SEC: i64 = 1_000_000_000;
pub const DEFAULT_DURATION_SECS: u64 = 3600;

/// Canonical identity of a cluster machine.
///
/// Equality and hashing use `(hostname, ip)` only. The agent id changes
/// every time an agent re-registers, so it is carried for display and
/// never compared.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct MachineIdentity {
    hostname: String,
    ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent_id: Option<String>,
}

impl MachineIdentity {
    pub fn new(hostname: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ip: ip.into(),
            agent_id: None,
        }
    }

    pub fn with_agent_id(self, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self {
            agent_id: if agent_id.is_empty() {
                None
            } else {
                Some(agent_id)
            },
            ..self
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    /// The same machine with the agent id dropped.
    pub fn without_agent_id(&self) -> Self {
        Self::new(self.hostname.clone(), self.ip.clone())
    }
}

impl PartialEq for MachineIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.hostname == other.hostname && self.ip == other.ip
    }
}

impl Hash for MachineIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hostname.hash(state);
        self.ip.hash(state);
    }
}

impl fmt::Display for MachineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hostname.is_empty(), self.ip.is_empty()) {
            (false, false) => write!(f, "{} ({})", self.hostname, self.ip),
            (true, _) => write!(f, "{}", self.ip),
            (false, true) => write!(f, "{}", self.hostname),
        }
    }
}

/// Maintenance state reported by the master. Machines it does not
/// mention are implicitly up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceState {
    Down,
    Draining,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub identity: MachineIdentity,
    pub state: MaintenanceState,
}

/// Current state of a machine in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineState {
    Down,
    Draining,
    Up,
}

impl From<MaintenanceState> for MachineState {
    fn from(state: MaintenanceState) -> Self {
        match state {
            MaintenanceState::Down => MachineState::Down,
            MaintenanceState::Draining => MachineState::Draining,
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineState::Down => write!(f, "DOWN"),
            MachineState::Draining => write!(f, "DRAINING"),
            MachineState::Up => write!(f, "UP"),
        }
    }
}

/// A future interval of planned unavailability for a set of machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWindow {
    machine_ids: Vec<MachineIdentity>,
    pub start_ns: i64,
    pub duration_ns: i64,
}

impl ScheduleWindow {
    /// Build a window, keeping only the first occurrence of each machine.
    pub fn new(machine_ids: Vec<MachineIdentity>, start_ns: i64, duration_ns: i64) -> Self {
        let mut unique: Vec<MachineIdentity> = Vec::with_capacity(machine_ids.len());
        for id in machine_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            machine_ids: unique,
            start_ns,
            duration_ns,
        }
    }

    pub fn machine_ids(&self) -> &[MachineIdentity] {
        &self.machine_ids
    }

    pub fn contains(&self, machine: &MachineIdentity) -> bool {
        self.machine_ids.contains(machine)
    }

    pub fn end_ns(&self) -> i64 {
        self.start_ns.saturating_add(self.duration_ns)
    }

    /// Same window without the machines matched by `remove`.
    pub(crate) fn without_machines(&self, remove: impl Fn(&MachineIdentity) -> bool) -> Self {
        Self {
            machine_ids: self
                .machine_ids
                .iter()
                .filter(|m| !remove(m))
                .cloned()
                .collect(),
            start_ns: self.start_ns,
            duration_ns: self.duration_ns,
        }
    }
}

/// The master's full set of maintenance windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub windows: Vec<ScheduleWindow>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// First window covering `machine`.
    pub fn window_for(&self, machine: &MachineIdentity) -> Option<&ScheduleWindow> {
        self.windows.iter().find(|w| w.contains(machine))
    }

    pub fn machines(&self) -> impl Iterator<Item = &MachineIdentity> {
        self.windows.iter().flat_map(|w| w.machine_ids.iter())
    }
}

/// One row of the merged cluster view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineView {
    pub hostname: String,
    pub ip: String,
    pub agent_id: Option<String>,
    pub state: MachineState,
    /// Window start in seconds since the epoch.
    pub start: Option<i64>,
    /// Window length in seconds.
    pub duration: Option<i64>,
    pub expired: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_equality_ignores_agent_id() {
        let a = MachineIdentity::new("a", "10.0.0.1").with_agent_id("S1");
        let b = MachineIdentity::new("a", "10.0.0.1").with_agent_id("S2");
        let c = MachineIdentity::new("a", "10.0.0.1");

        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(a, c);
        assert_ne!(a, MachineIdentity::new("a", "10.0.0.2"));
        assert_ne!(a, MachineIdentity::new("b", "10.0.0.1"));
    }

    #[test]
    fn identity_hash_matches_equality() {
        let mut set = HashSet::new();
        set.insert(MachineIdentity::new("a", "10.0.0.1").with_agent_id("S1"));
        assert!(set.contains(&MachineIdentity::new("a", "10.0.0.1").with_agent_id("S9")));
        assert!(!set.contains(&MachineIdentity::new("a", "10.0.0.9")));
    }

    #[test]
    fn empty_agent_id_is_none() {
        let id = MachineIdentity::new("a", "10.0.0.1").with_agent_id("");
        assert_eq!(id.agent_id(), None);
    }

    #[test]
    fn window_keeps_first_occurrence_only() {
        let window = ScheduleWindow::new(
            vec![
                MachineIdentity::new("a", "10.0.0.1"),
                MachineIdentity::new("b", "10.0.0.2"),
                MachineIdentity::new("a", "10.0.0.1").with_agent_id("S1"),
            ],
            0,
            NANOS_PER_SEC,
        );
        assert_eq!(window.machine_ids().len(), 2);
        assert_eq!(window.machine_ids()[0].hostname(), "a");
        assert_eq!(window.machine_ids()[1].hostname(), "b");
    }

    #[test]
    fn machine_state_sorts_down_first() {
        let mut states = vec![MachineState::Up, MachineState::Down, MachineState::Draining];
        states.sort();
        assert_eq!(
            states,
            vec![MachineState::Down, MachineState::Draining, MachineState::Up]
        );
    }

    #[test]
    fn display_omits_missing_parts() {
        assert_eq!(MachineIdentity::new("a", "10.0.0.1").to_string(), "a (10.0.0.1)");
        assert_eq!(MachineIdentity::new("", "10.0.0.1").to_string(), "10.0.0.1");
        assert_eq!(MachineIdentity::new("a", "").to_string(), "a");
    }
}
