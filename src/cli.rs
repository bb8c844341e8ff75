mod instances;
mod snapshots;
mod volumes;

pub use instances::InstancesArgs;
pub use snapshots::SnapshotsArgs;
pub use volumes::VolumesArgs;
