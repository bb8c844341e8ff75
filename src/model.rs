use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use thiserror::Error;

/// Tag key that groups instances into a project.
pub const PROJECT_TAG: &str = "Project";

/// Listing placeholder for instances that carry no project tag.
pub const NO_PROJECT: &str = "<no project>";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeId(String);

impl VolumeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
#[error("unrecognized lifecycle state `{0}`")]
pub struct UnknownState(pub String);

/// Backend-controlled lifecycle of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl InstanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "shutting-down" => Ok(Self::ShuttingDown),
            "terminated" => Ok(Self::Terminated),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    Pending,
    Completed,
    Error,
}

impl SnapshotState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Tag set of an instance. Keys are unique; built once per fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags(HashMap<String, String>);

impl Tags {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn project(&self) -> Option<&str> {
        self.get(PROJECT_TAG)
    }

    /// Project tag value, or the `<no project>` placeholder.
    pub fn project_or_default(&self) -> &str {
        self.project().unwrap_or(NO_PROJECT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: InstanceId,
    pub instance_type: String,
    pub availability_zone: String,
    pub state: InstanceState,
    pub public_dns_name: String,
    pub tags: Tags,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub id: VolumeId,
    pub instance_id: InstanceId,
    pub state: String,
    pub size_gib: i32,
    pub encrypted: bool,
    /// Snapshot history, newest first.
    pub snapshots: Vec<Snapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub volume_id: VolumeId,
    pub state: SnapshotState,
    pub progress: String,
    pub started_at: Option<DateTime<Local>>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_states_round_trip() {
        for state in [
            InstanceState::Pending,
            InstanceState::Running,
            InstanceState::ShuttingDown,
            InstanceState::Terminated,
            InstanceState::Stopping,
            InstanceState::Stopped,
        ] {
            assert_eq!(state.as_str().parse::<InstanceState>().unwrap(), state);
        }
        assert!("hibernated".parse::<InstanceState>().is_err());
    }

    #[test]
    fn snapshot_states_round_trip() {
        for state in [
            SnapshotState::Pending,
            SnapshotState::Completed,
            SnapshotState::Error,
        ] {
            assert_eq!(state.as_str().parse::<SnapshotState>().unwrap(), state);
        }
        assert!("queued".parse::<SnapshotState>().is_err());
    }

    #[test]
    fn missing_project_tag_falls_back_to_placeholder() {
        let tagged = Tags::from_pairs([(PROJECT_TAG, "valhalla")]);
        assert_eq!(tagged.project(), Some("valhalla"));
        assert_eq!(tagged.project_or_default(), "valhalla");

        let untagged = Tags::from_pairs([("Name", "bastion")]);
        assert_eq!(untagged.project(), None);
        assert_eq!(untagged.project_or_default(), NO_PROJECT);
    }
}
