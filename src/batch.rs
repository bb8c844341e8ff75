use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::fleet::{has_pending_snapshot, project_scope};
use crate::model::{Instance, InstanceId, InstanceState};
use crate::provider::{Provider, ProviderError};

/// Description attached to every snapshot this tool creates.
pub const SNAPSHOT_DESCRIPTION: &str = "Created by fleetsnap";

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Lifecycle verb applied across a filtered fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stop,
    Start,
    Reboot,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Reboot => "reboot",
        }
    }

    pub fn gerund(self) -> &'static str {
        match self {
            Self::Stop => "Stopping",
            Self::Start => "Starting",
            Self::Reboot => "Rebooting",
        }
    }

    pub fn past(self) -> &'static str {
        match self {
            Self::Stop => "stopped",
            Self::Start => "started",
            Self::Reboot => "rebooted",
        }
    }
}

/// Admission policy for bulk lifecycle changes: the run must be scoped to a
/// project or carry an explicit force override. The override never reaches
/// the backend call.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    scoped: bool,
    forced: bool,
}

impl Gate {
    pub fn new(project: Option<&str>, force: bool) -> Self {
        Self {
            scoped: project_scope(project).is_some(),
            forced: force,
        }
    }

    pub fn permits(self) -> bool {
        self.scoped || self.forced
    }
}

/// How long to poll for a lifecycle transition before giving up.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(15),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The lifecycle verb was accepted by the backend.
    Applied,
    /// The full stop-snapshot-start cycle ran; `failed` counts volumes whose
    /// snapshot request was rejected.
    Snapshotted {
        created: usize,
        skipped: usize,
        failed: usize,
    },
    /// Neither project scope nor force override was given.
    Refused,
    Failed(ProviderError),
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Applied | Self::Snapshotted { failed: 0, .. })
    }
}

#[derive(Debug)]
pub struct BatchItem {
    pub id: InstanceId,
    pub outcome: Outcome,
}

/// Per-instance outcomes of one bulk run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    items: Vec<BatchItem>,
}

impl BatchReport {
    fn push(&mut self, id: InstanceId, outcome: Outcome) {
        self.items.push(BatchItem { id, outcome });
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !item.outcome.succeeded())
            .count()
    }
}

/// Applies bulk actions one instance at a time. A single instance failure is
/// reported and recorded, never allowed to abort the batch.
pub struct Executor<'a> {
    provider: &'a dyn Provider,
    wait: WaitPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            wait: WaitPolicy::default(),
        }
    }

    pub fn with_wait_policy(provider: &'a dyn Provider, wait: WaitPolicy) -> Self {
        Self { provider, wait }
    }

    /// Issues one lifecycle verb per admitted instance.
    pub async fn apply(&self, action: Action, targets: &[&Instance], gate: Gate) -> BatchReport {
        let mut report = BatchReport::default();
        for instance in targets {
            if !gate.permits() {
                eprintln!(
                    "Refusing to {} {}: set --project or --force",
                    action.verb(),
                    instance.id
                );
                report.push(instance.id.clone(), Outcome::Refused);
                continue;
            }

            println!("{} {}...", action.gerund(), instance.id);
            let result = match action {
                Action::Stop => self.provider.stop_instance(&instance.id).await,
                Action::Start => self.provider.start_instance(&instance.id).await,
                Action::Reboot => self.provider.reboot_instance(&instance.id).await,
            };
            match result {
                Ok(()) => report.push(instance.id.clone(), Outcome::Applied),
                Err(err) => {
                    eprintln!("Could not {} {}: {err}", action.verb(), instance.id);
                    report.push(instance.id.clone(), Outcome::Failed(err));
                }
            }
        }
        report
    }

    /// Runs the stop-snapshot-start cycle over each instance in turn. One
    /// cycle completes, waits included, before the next instance begins.
    pub async fn snapshot_instances(&self, targets: &[&Instance]) -> BatchReport {
        let mut report = BatchReport::default();
        for instance in targets {
            let outcome = match self.snapshot_cycle(instance).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    eprintln!("Could not snapshot {}: {err}", instance.id);
                    Outcome::Failed(err)
                }
            };
            report.push(instance.id.clone(), outcome);
        }
        println!("Done.");
        report
    }

    async fn snapshot_cycle(&self, instance: &Instance) -> Result<Outcome, ProviderError> {
        println!("Stopping {}...", instance.id);
        self.provider.stop_instance(&instance.id).await?;
        self.wait_until(&instance.id, InstanceState::Stopped).await?;

        let mut created = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for volume in &instance.volumes {
            if has_pending_snapshot(volume) {
                println!("  Skipping {}, snapshot already in progress", volume.id);
                skipped += 1;
                continue;
            }
            println!("  Creating snapshot of {}...", volume.id);
            match self
                .provider
                .create_snapshot(&volume.id, SNAPSHOT_DESCRIPTION)
                .await
            {
                Ok(_) => created += 1,
                Err(err) => {
                    eprintln!("Could not snapshot {}: {err}", volume.id);
                    failed += 1;
                }
            }
        }

        println!("Starting {}...", instance.id);
        self.provider.start_instance(&instance.id).await?;
        self.wait_until(&instance.id, InstanceState::Running).await?;

        Ok(Outcome::Snapshotted {
            created,
            skipped,
            failed,
        })
    }

    async fn wait_until(
        &self,
        id: &InstanceId,
        target: InstanceState,
    ) -> Result<(), ProviderError> {
        let deadline = Instant::now() + self.wait.timeout;
        let mut delay = self.wait.interval;
        loop {
            if self.provider.instance_state(id).await? == target {
                return Ok(());
            }
            if Instant::now() + delay > deadline {
                return Err(ProviderError::WaitTimeout {
                    id: id.clone(),
                    target,
                    timeout: self.wait.timeout,
                });
            }
            sleep(delay).await;
            delay = (delay * 2).min(MAX_POLL_INTERVAL);
        }
    }
}
