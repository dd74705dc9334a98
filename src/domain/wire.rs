//! Serde models of the Mesos master maintenance API and their projection
//! into domain types.

use serde::{Deserialize, Serialize};

use crate::error::MaintenanceError;

use super::types::{MachineIdentity, Schedule, ScheduleWindow};

/// `GET state-summary`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSummary {
    #[serde(default)]
    pub slaves: Vec<AgentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub hostname: String,
    /// libprocess pid, e.g. `slave(1)@10.0.0.1:5051`.
    pub pid: String,
}

impl AgentRecord {
    pub fn to_identity(&self) -> Result<MachineIdentity, MaintenanceError> {
        let ip = parse_pid_ip(&self.pid).ok_or_else(|| MaintenanceError::MalformedAgent {
            agent: self.id.clone(),
            reason: format!("cannot extract an address from pid '{}'", self.pid),
        })?;
        Ok(MachineIdentity::new(self.hostname.clone(), ip).with_agent_id(self.id.clone()))
    }
}

/// Extract the host part of a libprocess pid (`name@host:port`).
pub fn parse_pid_ip(pid: &str) -> Option<String> {
    let (_, address) = pid.split_once('@')?;
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    Some(host.to_string())
}

/// Machine id as the master encodes it: either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMachineId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl WireMachineId {
    fn is_blank(&self) -> bool {
        self.hostname.as_deref().unwrap_or_default().is_empty()
            && self.ip.as_deref().unwrap_or_default().is_empty()
    }

    pub fn to_identity(&self) -> MachineIdentity {
        MachineIdentity::new(
            self.hostname.clone().unwrap_or_default(),
            self.ip.clone().unwrap_or_default(),
        )
    }
}

impl From<&MachineIdentity> for WireMachineId {
    fn from(id: &MachineIdentity) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            hostname: non_empty(id.hostname()),
            ip: non_empty(id.ip()),
        }
    }
}

pub fn to_wire_ids(machines: &[MachineIdentity]) -> Vec<WireMachineId> {
    machines.iter().map(WireMachineId::from).collect()
}

/// `GET maintenance/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceStatus {
    #[serde(default)]
    pub draining_machines: Vec<DrainingMachine>,
    #[serde(default)]
    pub down_machines: Vec<WireMachineId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainingMachine {
    pub id: WireMachineId,
}

/// `GET`/`POST maintenance/schedule`
///
/// `windows: None` serializes to `{}`, which the master treats as
/// "remove every window".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<WireWindow>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_ids: Option<Vec<WireMachineId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailability: Option<Unavailability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Unavailability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Nanos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Nanos>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Nanos {
    pub nanoseconds: i64,
}

impl SchedulePayload {
    /// The bulk "clear everything" body.
    pub fn clear() -> Self {
        Self { windows: None }
    }

    /// Validate and convert. A payload without `windows` means no schedule
    /// exists at all. Any incomplete window or machine entry fails the whole
    /// conversion rather than being skipped.
    pub fn into_schedule(self) -> Result<Option<Schedule>, MaintenanceError> {
        let Some(windows) = self.windows else {
            return Ok(None);
        };

        let mut schedule = Schedule::default();
        for (index, window) in windows.into_iter().enumerate() {
            let machine_ids = window.machine_ids.ok_or_else(|| {
                MaintenanceError::MalformedSchedule(format!("window {} has no machine_ids", index))
            })?;
            let unavailability = window.unavailability.ok_or_else(|| {
                MaintenanceError::MalformedSchedule(format!(
                    "window {} has no unavailability",
                    index
                ))
            })?;
            let start = unavailability.start.ok_or_else(|| {
                MaintenanceError::MalformedSchedule(format!("window {} has no start", index))
            })?;
            let duration = unavailability.duration.ok_or_else(|| {
                MaintenanceError::MalformedSchedule(format!("window {} has no duration", index))
            })?;

            let mut machines = Vec::with_capacity(machine_ids.len());
            for (position, machine) in machine_ids.iter().enumerate() {
                if machine.is_blank() {
                    return Err(MaintenanceError::MalformedSchedule(format!(
                        "window {} machine {} has neither hostname nor ip",
                        index, position
                    )));
                }
                machines.push(machine.to_identity());
            }

            schedule.windows.push(ScheduleWindow::new(
                machines,
                start.nanoseconds,
                duration.nanoseconds,
            ));
        }
        Ok(Some(schedule))
    }
}

impl From<&Schedule> for SchedulePayload {
    fn from(schedule: &Schedule) -> Self {
        let windows = schedule
            .windows
            .iter()
            .map(|w| WireWindow {
                machine_ids: Some(to_wire_ids(w.machine_ids())),
                unavailability: Some(Unavailability {
                    start: Some(Nanos {
                        nanoseconds: w.start_ns,
                    }),
                    duration: Some(Nanos {
                        nanoseconds: w.duration_ns,
                    }),
                }),
            })
            .collect();
        Self {
            windows: Some(windows),
        }
    }
}
