mod cli;

use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;
use clap::{Parser, Subcommand};
use cli::{InstancesArgs, SnapshotsArgs, VolumesArgs};
use fleetsnap::aws::{self, ec2::Ec2Provider};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Credentials profile (default: config file, then environment)
    #[arg(long, global = true, value_name = "NAME")]
    profile: Option<String>,

    /// Region override
    #[arg(long, global = true, value_name = "REGION")]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commands for EC2 instances
    Instances(InstancesArgs),
    /// Commands for EC2 volumes
    Volumes(VolumesArgs),
    /// Commands for EC2 volume snapshots
    Snapshots(SnapshotsArgs),
}

/// Defaults persisted in the user configuration file.
#[derive(Serialize, Deserialize, Default)]
struct Settings {
    profile: Option<String>,
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings: Settings = confy::load("fleetsnap", None)?;

    let profile = cli.profile.or(settings.profile);
    let region = match cli.region.or(settings.region) {
        Some(name) => Some(Region::new(name)),
        None => RegionProviderChain::default_provider().region().await,
    };

    let sdk_config = aws::sdk_config(profile.as_deref()).await;
    let provider = Ec2Provider::new(&sdk_config, region);

    use Commands::*;
    match cli.command {
        Instances(args) => args.main(&provider).await,
        Volumes(args) => args.main(&provider).await,
        Snapshots(args) => args.main(&provider).await,
    }
}
