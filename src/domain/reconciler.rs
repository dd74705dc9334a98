//! Maintenance reconciliation.
//!
//! Every operation takes a freshly fetched `ClusterView` and produces a
//! `Plan`: the ordered control-plane writes needed to honor the request,
//! plus informational notes for machines that need nothing. Planning is
//! pure; the `Mutator` applies the writes.

use chrono::{DateTime, Utc};

use super::fetch::ClusterView;
use super::types::{
    MachineIdentity, MaintenanceState, Schedule, ScheduleWindow, StatusRecord, NANOS_PER_SEC,
};

/// Requested machines partitioned by their current maintenance state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub not_scheduled: Vec<MachineIdentity>,
    pub down: Vec<MachineIdentity>,
    pub draining: Vec<MachineIdentity>,
}

/// Partition `machines` by the first status record matching each one.
/// Machines without a status record are `not_scheduled`.
pub fn classify(machines: &[MachineIdentity], status: &[StatusRecord]) -> Classification {
    let mut out = Classification::default();
    for machine in machines {
        match status.iter().find(|r| r.identity == *machine).map(|r| r.state) {
            Some(MaintenanceState::Down) => out.down.push(machine.clone()),
            Some(MaintenanceState::Draining) => out.draining.push(machine.clone()),
            None => out.not_scheduled.push(machine.clone()),
        }
    }
    out
}

/// Remove every entry for `targets` from every window and drop windows
/// left empty. Untouched windows keep their order and contents.
pub fn prune_conflicts(schedule: &Schedule, targets: &[MachineIdentity]) -> Schedule {
    Schedule {
        windows: schedule
            .windows
            .iter()
            .map(|w| w.without_machines(|m| targets.contains(m)))
            .filter(|w| !w.machine_ids().is_empty())
            .collect(),
    }
}

/// A single control-plane write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Replace the schedule wholesale.
    WriteSchedule(Schedule),
    /// Remove every window.
    ClearSchedule,
    Up(Vec<MachineIdentity>),
    Down(Vec<MachineIdentity>),
}

impl Mutation {
    pub fn operation(&self) -> &'static str {
        match self {
            Mutation::WriteSchedule(_) => "schedule update",
            Mutation::ClearSchedule => "schedule flush",
            Mutation::Up(_) => "machine up",
            Mutation::Down(_) => "machine down",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub mutations: Vec<Mutation>,
    pub notes: Vec<String>,
}

impl Plan {
    fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    fn append(&mut self, other: Plan) {
        self.notes.extend(other.notes);
        self.mutations.extend(other.mutations);
    }

    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub default_duration_secs: u64,
    /// Flush draining machines before `up` and schedule unscheduled
    /// machines before `down`.
    pub implicit_transitions: bool,
    pub now: DateTime<Utc>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            default_duration_secs: super::types::DEFAULT_DURATION_SECS,
            implicit_transitions: true,
            now: Utc::now(),
        }
    }
}

pub struct Reconciler<'a> {
    view: &'a ClusterView,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(view: &'a ClusterView, options: ReconcileOptions) -> Self {
        Self { view, options }
    }

    pub fn classify(&self, machines: &[MachineIdentity]) -> Classification {
        classify(machines, &self.view.status)
    }

    /// Put every requested machine that is not already down into one new
    /// window. Existing entries for those machines are pruned first, so a
    /// machine never sits in two windows.
    pub fn schedule(
        &self,
        start_secs: Option<i64>,
        duration_secs: Option<u64>,
        machines: &[MachineIdentity],
    ) -> Plan {
        let mut plan = Plan::default();
        let buckets = self.classify(machines);

        let targets: Vec<MachineIdentity> = buckets
            .not_scheduled
            .iter()
            .chain(&buckets.draining)
            .cloned()
            .collect();
        if targets.is_empty() {
            plan.note("Requested machines are already DOWN, nothing to schedule");
            return plan;
        }
        for machine in &buckets.down {
            plan.note(format!("{} is already DOWN, not scheduled", machine));
        }

        let start_ns = match start_secs {
            Some(secs) => secs.saturating_mul(NANOS_PER_SEC),
            None => self
                .options
                .now
                .timestamp_nanos_opt()
                .unwrap_or_else(|| self.options.now.timestamp().saturating_mul(NANOS_PER_SEC)),
        };
        let duration_secs = duration_secs.unwrap_or(self.options.default_duration_secs);
        let duration_ns = i64::try_from(duration_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(NANOS_PER_SEC);

        let current = self.view.schedule.clone().unwrap_or_default();
        let mut schedule = prune_conflicts(&current, &targets);
        schedule
            .windows
            .push(ScheduleWindow::new(targets, start_ns, duration_ns));

        plan.mutations.push(Mutation::WriteSchedule(schedule));
        plan
    }

    /// Drop the given machines from the schedule. An empty list is the
    /// bulk flush-all.
    pub fn flush(&self, machines: &[MachineIdentity]) -> Plan {
        let mut plan = Plan::default();
        let Some(current) = &self.view.schedule else {
            plan.note("No maintenance schedule found on the master");
            return plan;
        };

        if machines.is_empty() {
            plan.mutations.push(Mutation::ClearSchedule);
            return plan;
        }

        let pruned = prune_conflicts(current, machines);
        if pruned == *current {
            plan.note("None of the requested machines are scheduled");
            return plan;
        }
        plan.mutations.push(Mutation::WriteSchedule(pruned));
        plan
    }

    pub fn flush_all(&self) -> Plan {
        self.flush(&[])
    }

    pub fn bring_up(&self, machines: &[MachineIdentity]) -> Plan {
        self.up_plan(machines, true)
    }

    /// Bring up every down machine and flush every draining one.
    pub fn bring_up_all(&self) -> Plan {
        let mut plan = self.up_plan(&self.view.known_machines(), false);
        if plan.is_noop() && plan.notes.is_empty() {
            plan.note("No machines are DOWN or DRAINING");
        }
        plan
    }

    fn up_plan(&self, machines: &[MachineIdentity], announce_up: bool) -> Plan {
        let mut plan = Plan::default();
        let buckets = self.classify(machines);

        if announce_up {
            for machine in &buckets.not_scheduled {
                plan.note(format!("{} is already UP", machine));
            }
        }

        if !buckets.draining.is_empty() {
            if self.options.implicit_transitions {
                plan.append(self.flush(&buckets.draining));
            } else {
                for machine in &buckets.draining {
                    plan.note(format!(
                        "{} is DRAINING, flush its window before bringing it up",
                        machine
                    ));
                }
            }
        }

        if !buckets.down.is_empty() {
            plan.mutations.push(Mutation::Up(buckets.down));
        }
        plan
    }

    pub fn bring_down(&self, machines: &[MachineIdentity]) -> Plan {
        let mut plan = Plan::default();
        let buckets = self.classify(machines);

        for machine in &buckets.down {
            plan.note(format!("{} is already DOWN", machine));
        }

        let mut to_down = Vec::new();
        if !buckets.not_scheduled.is_empty() {
            if self.options.implicit_transitions {
                plan.append(self.schedule(None, None, &buckets.not_scheduled));
                to_down.extend(buckets.not_scheduled.iter().cloned());
            } else {
                for machine in &buckets.not_scheduled {
                    plan.note(format!(
                        "{} has no maintenance window, schedule it before bringing it down",
                        machine
                    ));
                }
            }
        }
        to_down.extend(buckets.draining.iter().cloned());

        if !to_down.is_empty() {
            plan.mutations.push(Mutation::Down(to_down));
        }
        plan
    }
}
