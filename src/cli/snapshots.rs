use anyhow::Result;
use clap::{Args, Subcommand};
use fleetsnap::fleet::filter_instances;
use fleetsnap::listing;
use fleetsnap::provider::Provider;

#[derive(Args)]
pub struct SnapshotsArgs {
    #[command(subcommand)]
    command: SnapshotsCmd,
}

#[derive(Subcommand)]
enum SnapshotsCmd {
    /// List volume snapshots
    List {
        /// Only snapshots of instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Every snapshot per volume, not just the most recent
        #[arg(long)]
        all: bool,
    },
}

impl SnapshotsArgs {
    pub async fn main(self, provider: &dyn Provider) -> Result<()> {
        match self.command {
            SnapshotsCmd::List { project, all } => {
                let fleet = provider.instances().await?;
                for instance in filter_instances(&fleet, project.as_deref()) {
                    for row in listing::snapshot_rows(instance, all) {
                        println!("{row}");
                    }
                }
                Ok(())
            }
        }
    }
}
