//! Maintenance service: one call per user request.
//!
//! Each operation runs the same pipeline:
//!   fetch ClusterView → resolve host tokens → plan → apply writes
//!
//! Nothing is cached between operations. The schedule is read, edited and
//! written back without any version check, so two operators editing the
//! schedule at the same time can overwrite each other's windows; the
//! master API offers no way to detect this.

use chrono::Utc;
use tracing::{info, warn};

use crate::client::MasterClient;
use crate::config::MaintenanceConfig;
use crate::error::MaintenanceError;
use crate::reporter::Reporter;

use super::fetch::ClusterView;
use super::identity::HostToken;
use super::mutator::Mutator;
use super::reconciler::{Plan, ReconcileOptions, Reconciler};
use super::types::{MachineIdentity, MachineView};

/// Result of one maintenance request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Control-plane writes applied.
    pub writes: usize,
    /// Host tokens that could not be resolved.
    pub unresolved: Vec<String>,
}

pub struct MaintenanceService {
    client: MasterClient,
    config: MaintenanceConfig,
}

impl MaintenanceService {
    pub fn new(client: MasterClient, config: MaintenanceConfig) -> Self {
        Self { client, config }
    }

    /// Merged per-machine view for display.
    pub async fn list(&self, reporter: &dyn Reporter) -> Result<Vec<MachineView>, MaintenanceError> {
        let view = self.fetch(reporter).await?;
        Ok(view.merged(Utc::now()))
    }

    pub async fn up(
        &self,
        hosts: &[String],
        all: bool,
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        if !all && hosts.is_empty() {
            reporter.warn("At least one host must be given");
            return Ok(Outcome::default());
        }
        let view = self.fetch(reporter).await?;
        if all {
            let plan = self.reconciler(&view).bring_up_all();
            return self.execute(plan, Vec::new(), reporter).await;
        }
        self.run(&view, hosts, reporter, |r, machines| r.bring_up(machines))
            .await
    }

    pub async fn down(
        &self,
        hosts: &[String],
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        if hosts.is_empty() {
            reporter.warn("At least one host must be given");
            return Ok(Outcome::default());
        }
        let view = self.fetch(reporter).await?;
        self.run(&view, hosts, reporter, |r, machines| r.bring_down(machines))
            .await
    }

    pub async fn schedule(
        &self,
        start_secs: Option<i64>,
        duration_secs: Option<u64>,
        hosts: &[String],
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        if hosts.is_empty() {
            reporter.warn("At least one host must be given");
            return Ok(Outcome::default());
        }
        let view = self.fetch(reporter).await?;
        self.run(&view, hosts, reporter, |r, machines| {
            r.schedule(start_secs, duration_secs, machines)
        })
        .await
    }

    pub async fn flush(
        &self,
        hosts: &[String],
        all: bool,
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        if !all && hosts.is_empty() {
            reporter.warn("At least one host must be given");
            return Ok(Outcome::default());
        }
        let view = self.fetch(reporter).await?;
        if all {
            let plan = self.reconciler(&view).flush_all();
            return self.execute(plan, Vec::new(), reporter).await;
        }
        self.run(&view, hosts, reporter, |r, machines| r.flush(machines))
            .await
    }

    // ── Internal helpers ───────────────────────────────────

    async fn fetch(&self, reporter: &dyn Reporter) -> Result<ClusterView, MaintenanceError> {
        ClusterView::fetch(&self.client, self.config.status_failure, reporter).await
    }

    fn reconciler<'v>(&self, view: &'v ClusterView) -> Reconciler<'v> {
        Reconciler::new(
            view,
            ReconcileOptions {
                default_duration_secs: self.config.default_duration_secs,
                implicit_transitions: self.config.implicit_transitions,
                now: Utc::now(),
            },
        )
    }

    /// Resolve `hosts`, plan with `make_plan` and apply. When no token
    /// resolves nothing is planned: an empty machine list would otherwise
    /// turn a targeted flush into a flush-all.
    async fn run<F>(
        &self,
        view: &ClusterView,
        hosts: &[String],
        reporter: &dyn Reporter,
        make_plan: F,
    ) -> Result<Outcome, MaintenanceError>
    where
        F: FnOnce(&Reconciler<'_>, &[MachineIdentity]) -> Plan,
    {
        let (machines, unresolved) = resolve_hosts(view, hosts, reporter);
        if machines.is_empty() {
            reporter.warn("No requested host matched a known machine, nothing to do");
            return Ok(Outcome {
                writes: 0,
                unresolved,
            });
        }

        let plan = make_plan(&self.reconciler(view), &machines);
        self.execute(plan, unresolved, reporter).await
    }

    async fn execute(
        &self,
        plan: Plan,
        unresolved: Vec<String>,
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        for note in &plan.notes {
            reporter.info(note);
        }
        info!(writes = plan.mutations.len(), "applying maintenance plan");
        let writes = Mutator::new(&self.client)
            .apply_all(&plan.mutations, reporter)
            .await?;
        Ok(Outcome { writes, unresolved })
    }
}

/// Resolve every token against the view's lookup table. Unresolvable and
/// malformed tokens are reported one by one and returned; they never stop
/// the remaining tokens from resolving.
pub fn resolve_hosts(
    view: &ClusterView,
    hosts: &[String],
    reporter: &dyn Reporter,
) -> (Vec<MachineIdentity>, Vec<String>) {
    let table = view.lookup_table();
    let mut machines: Vec<MachineIdentity> = Vec::new();
    let mut unresolved = Vec::new();

    for host in hosts {
        match HostToken::parse(host).and_then(|token| table.resolve(&token)) {
            Ok(machine) => {
                if !machines.contains(&machine) {
                    machines.push(machine);
                }
            }
            Err(e) => {
                warn!(host = %host, error = %e, "host not resolved");
                reporter.warn(&e.to_string());
                unresolved.push(host.clone());
            }
        }
    }
    (machines, unresolved)
}
