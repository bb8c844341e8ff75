use anyhow::Result;
use clap::{Args, Subcommand};
use fleetsnap::fleet::filter_instances;
use fleetsnap::listing;
use fleetsnap::provider::Provider;

#[derive(Args)]
pub struct VolumesArgs {
    #[command(subcommand)]
    command: VolumesCmd,
}

#[derive(Subcommand)]
enum VolumesCmd {
    /// List volumes
    List {
        /// Only volumes of instances tagged Project=<NAME>
        #[arg(long, value_name = "NAME")]
        project: Option<String>,
    },
}

impl VolumesArgs {
    pub async fn main(self, provider: &dyn Provider) -> Result<()> {
        match self.command {
            VolumesCmd::List { project } => {
                let fleet = provider.instances().await?;
                for instance in filter_instances(&fleet, project.as_deref()) {
                    for row in listing::volume_rows(instance) {
                        println!("{row}");
                    }
                }
                Ok(())
            }
        }
    }
}
