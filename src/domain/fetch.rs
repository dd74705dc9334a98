//! Reads the three independent views of the cluster from the master and
//! assembles them into a `ClusterView`.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::client::MasterClient;
use crate::config::StatusFailurePolicy;
use crate::error::MaintenanceError;
use crate::reporter::Reporter;

use super::identity::Inventory;
use super::types::{
    MachineIdentity, MachineState, MachineView, MaintenanceState, Schedule, StatusRecord,
    NANOS_PER_SEC,
};
use super::wire::{MaintenanceStatus, SchedulePayload, StateSummary};

pub async fn fetch_inventory(client: &MasterClient) -> Result<Vec<MachineIdentity>, MaintenanceError> {
    let summary = client
        .state_summary()
        .await
        .map_err(|e| MaintenanceError::fetch("agent summary", e))?;
    project_inventory(summary)
}

pub async fn fetch_status(
    client: &MasterClient,
    inventory: &Inventory,
) -> Result<Vec<StatusRecord>, MaintenanceError> {
    let status = client
        .maintenance_status()
        .await
        .map_err(|e| MaintenanceError::fetch("maintenance status", e))?;
    Ok(project_status(status, inventory))
}

pub async fn fetch_schedule(client: &MasterClient) -> Result<Option<Schedule>, MaintenanceError> {
    client
        .maintenance_schedule()
        .await
        .map_err(|e| MaintenanceError::fetch("maintenance schedule", e))?
        .into_schedule()
}

pub fn project_inventory(summary: StateSummary) -> Result<Vec<MachineIdentity>, MaintenanceError> {
    summary.slaves.iter().map(|a| a.to_identity()).collect()
}

/// Tag every draining and down machine, borrowing the registered agent's
/// identity when one matches. Unmatched machines keep the identity the
/// master reported, without an agent id.
pub fn project_status(status: MaintenanceStatus, inventory: &Inventory) -> Vec<StatusRecord> {
    let draining = status
        .draining_machines
        .iter()
        .map(|m| (m.id.to_identity(), MaintenanceState::Draining));
    let down = status
        .down_machines
        .iter()
        .map(|m| (m.to_identity(), MaintenanceState::Down));

    draining
        .chain(down)
        .map(|(identity, state)| StatusRecord {
            identity: inventory.find(&identity).cloned().unwrap_or(identity),
            state,
        })
        .collect()
}

/// Everything known about the cluster at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ClusterView {
    pub inventory: Inventory,
    pub status: Vec<StatusRecord>,
    pub schedule: Option<Schedule>,
}

impl ClusterView {
    pub fn new(
        inventory: Vec<MachineIdentity>,
        status: Vec<StatusRecord>,
        schedule: Option<Schedule>,
    ) -> Self {
        Self {
            inventory: Inventory::new(inventory),
            status,
            schedule,
        }
    }

    /// Issue the three reads concurrently and assemble them. Inventory and
    /// schedule failures are fatal; a status failure follows `policy`.
    pub async fn fetch(
        client: &MasterClient,
        policy: StatusFailurePolicy,
        reporter: &dyn Reporter,
    ) -> Result<Self, MaintenanceError> {
        let (summary, status, schedule) = tokio::join!(
            client.state_summary(),
            client.maintenance_status(),
            client.maintenance_schedule(),
        );

        let summary = summary.map_err(|e| MaintenanceError::fetch("agent summary", e))?;
        let inventory = Inventory::new(project_inventory(summary)?);

        let status = match status {
            Ok(status) => project_status(status, &inventory),
            Err(e) => {
                let err = MaintenanceError::fetch("maintenance status", e);
                match policy {
                    StatusFailurePolicy::Fail => return Err(err),
                    StatusFailurePolicy::AssumeUp => {
                        warn!(error = %err, "status unavailable, assuming all machines are up");
                        reporter.warn(&format!("{}; assuming all machines are up", err));
                        Vec::new()
                    }
                }
            }
        };

        let schedule = schedule
            .map_err(|e| MaintenanceError::fetch("maintenance schedule", e))?
            .into_schedule()?;

        info!(
            agents = inventory.len(),
            status = status.len(),
            windows = schedule.as_ref().map(|s| s.windows.len()),
            "fetched cluster view"
        );

        Ok(Self {
            inventory,
            status,
            schedule,
        })
    }

    /// Lookup table for host tokens: registered agents first, then machines
    /// that only appear in live status (down machines are not agents).
    pub fn lookup_table(&self) -> Inventory {
        let mut table = self.inventory.clone();
        table.extend(self.status.iter().map(|r| r.identity.clone()));
        table
    }

    /// Every machine the master knows about, deduplicated by identity.
    pub fn known_machines(&self) -> Vec<MachineIdentity> {
        let mut machines: Vec<MachineIdentity> = Vec::new();
        for machine in self
            .inventory
            .machines()
            .iter()
            .chain(self.status.iter().map(|r| &r.identity))
        {
            if !machines.contains(machine) {
                machines.push(machine.without_agent_id());
            }
        }
        machines
    }

    /// Merge status and schedule into one row per machine of interest:
    /// every down or draining machine and every scheduled machine.
    pub fn merged(&self, now: DateTime<Utc>) -> Vec<MachineView> {
        let now_ns = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp().saturating_mul(NANOS_PER_SEC));

        let mut seen: Vec<MachineIdentity> = Vec::new();
        let mut rows = Vec::new();

        let scheduled_up = self
            .schedule
            .iter()
            .flat_map(|s| s.machines())
            .map(|m| (m, MachineState::Up));
        let with_status = self
            .status
            .iter()
            .map(|r| (&r.identity, MachineState::from(r.state)));

        for (identity, state) in with_status.chain(scheduled_up) {
            if seen.contains(identity) {
                continue;
            }
            seen.push(identity.clone());

            let agent = self.inventory.find(identity).unwrap_or(identity);
            let window = self.schedule.as_ref().and_then(|s| s.window_for(identity));
            rows.push(MachineView {
                hostname: identity.hostname().to_string(),
                ip: identity.ip().to_string(),
                agent_id: agent.agent_id().map(str::to_string),
                state,
                start: window.map(|w| w.start_ns / NANOS_PER_SEC),
                duration: window.map(|w| w.duration_ns / NANOS_PER_SEC),
                expired: window.map(|w| now_ns >= w.end_ns()),
            });
        }

        rows.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| a.hostname.cmp(&b.hostname))
                .then_with(|| a.ip.cmp(&b.ip))
        });
        rows
    }
}
