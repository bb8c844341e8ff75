use anyhow::{ensure, Result};
use clap::{Args, Subcommand};
use fleetsnap::batch::{Action, Executor, Gate};
use fleetsnap::fleet::filter_instances;
use fleetsnap::listing;
use fleetsnap::provider::Provider;

#[derive(Args)]
pub struct InstancesArgs {
    #[command(subcommand)]
    command: InstancesCmd,
}

#[derive(Subcommand)]
enum InstancesCmd {
    /// List instances
    List {
        /// Only instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,
    },
    /// Stop each instance, snapshot its volumes, then start it again
    Snapshot {
        /// Only instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,
    },
    /// Stop instances
    Stop {
        /// Only instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Act on the whole account without a project scope
        #[arg(long)]
        force: bool,
    },
    /// Start instances
    Start {
        /// Only instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Act on the whole account without a project scope
        #[arg(long)]
        force: bool,
    },
    /// Reboot instances
    Reboot {
        /// Only instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Act on the whole account without a project scope
        #[arg(long)]
        force: bool,
    },
}

impl InstancesArgs {
    pub async fn main(self, provider: &dyn Provider) -> Result<()> {
        match self.command {
            InstancesCmd::List { project } => {
                let fleet = provider.instances().await?;
                for instance in filter_instances(&fleet, project.as_deref()) {
                    println!("{}", listing::instance_row(instance));
                }
                Ok(())
            }
            InstancesCmd::Snapshot { project } => {
                let fleet = provider.instances().await?;
                let targets = filter_instances(&fleet, project.as_deref());
                let report = Executor::new(provider).snapshot_instances(&targets).await;
                let failures = report.failures();
                ensure!(
                    failures == 0,
                    "snapshots failed for {failures} of {} instances",
                    report.len()
                );
                Ok(())
            }
            InstancesCmd::Stop { project, force } => {
                run_action(provider, Action::Stop, project, force).await
            }
            InstancesCmd::Start { project, force } => {
                run_action(provider, Action::Start, project, force).await
            }
            InstancesCmd::Reboot { project, force } => {
                run_action(provider, Action::Reboot, project, force).await
            }
        }
    }
}

async fn run_action(
    provider: &dyn Provider,
    action: Action,
    project: Option<String>,
    force: bool,
) -> Result<()> {
    let fleet = provider.instances().await?;
    let targets = filter_instances(&fleet, project.as_deref());
    let gate = Gate::new(project.as_deref(), force);
    let report = Executor::new(provider).apply(action, &targets, gate).await;
    let failures = report.failures();
    ensure!(
        failures == 0,
        "{failures} of {} instances were not {}",
        report.len(),
        action.past()
    );
    Ok(())
}
