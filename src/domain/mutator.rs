//! The only component that writes to the master.
//!
//! Each mutation is a single attempt. Failures are returned with the
//! operation name; nothing is retried and nothing already applied is
//! rolled back.

use tracing::{error, info};

use crate::client::MasterClient;
use crate::error::MaintenanceError;
use crate::reporter::Reporter;

use super::reconciler::Mutation;
use super::wire::{to_wire_ids, SchedulePayload};

pub struct Mutator<'a> {
    client: &'a MasterClient,
}

impl<'a> Mutator<'a> {
    pub fn new(client: &'a MasterClient) -> Self {
        Self { client }
    }

    pub async fn apply(
        &self,
        mutation: &Mutation,
        reporter: &dyn Reporter,
    ) -> Result<(), MaintenanceError> {
        let operation = mutation.operation();
        let result = match mutation {
            Mutation::WriteSchedule(schedule) => {
                self.client
                    .update_schedule(&SchedulePayload::from(schedule))
                    .await
            }
            Mutation::ClearSchedule => self.client.update_schedule(&SchedulePayload::clear()).await,
            Mutation::Up(machines) => self.client.machines_up(&to_wire_ids(machines)).await,
            Mutation::Down(machines) => self.client.machines_down(&to_wire_ids(machines)).await,
        };

        if let Err(e) = result {
            error!(operation, error = %e, "master rejected write");
            return Err(MaintenanceError::mutation(operation, e));
        }
        info!(operation, "write applied");

        match mutation {
            Mutation::WriteSchedule(schedule) => reporter.success(&format!(
                "Schedule updated ({} window(s))",
                schedule.windows.len()
            )),
            Mutation::ClearSchedule => reporter.success("All maintenance windows flushed"),
            Mutation::Up(machines) => {
                for machine in machines {
                    reporter.success(&format!("{} is now UP", machine));
                }
            }
            Mutation::Down(machines) => {
                for machine in machines {
                    reporter.success(&format!("{} is now DOWN", machine));
                }
            }
        }
        Ok(())
    }

    /// Apply mutations in order, stopping at the first failure. Returns the
    /// number applied.
    pub async fn apply_all(
        &self,
        mutations: &[Mutation],
        reporter: &dyn Reporter,
    ) -> Result<usize, MaintenanceError> {
        for (applied, mutation) in mutations.iter().enumerate() {
            if let Err(e) = self.apply(mutation, reporter).await {
                if applied > 0 {
                    reporter.warn(&format!(
                        "{} of {} write(s) were applied before the failure",
                        applied,
                        mutations.len()
                    ));
                }
                return Err(e);
            }
        }
        Ok(mutations.len())
    }
}
