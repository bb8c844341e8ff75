use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Instance, InstanceId, InstanceState, SnapshotId, VolumeId};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend rejected a request or returned an unusable response.
    #[error("{0}")]
    Api(String),
    /// An instance did not reach the expected state within the wait budget.
    #[error("{id} did not reach `{target}` within {}s", .timeout.as_secs())]
    WaitTimeout {
        id: InstanceId,
        target: InstanceState,
        timeout: Duration,
    },
}

impl ProviderError {
    /// Wraps a backend error, keeping the full cause chain in the message.
    pub fn api(err: impl Into<anyhow::Error>) -> Self {
        Self::Api(format!("{:#}", err.into()))
    }
}

/// Boundary to the cloud backend. Constructed once at startup and passed to
/// every component that talks to the fleet.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Enumerates the fleet with volumes and snapshot history attached.
    /// Each volume's history is ordered newest first.
    async fn instances(&self) -> Result<Vec<Instance>, ProviderError>;

    /// Current lifecycle state of a single instance.
    async fn instance_state(&self, id: &InstanceId) -> Result<InstanceState, ProviderError>;

    async fn stop_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    async fn start_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    async fn reboot_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    /// Requests a new snapshot of the volume and returns its id.
    async fn create_snapshot(
        &self,
        volume: &VolumeId,
        description: &str,
    ) -> Result<SnapshotId, ProviderError>;
}
