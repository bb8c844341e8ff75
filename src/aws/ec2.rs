use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2 as ec2;
use aws_types::region::Region;
use chrono::{DateTime, Local};
use ec2::config::Builder;
use ec2::primitives::DateTime as SdkDateTime;
use ec2::types::Filter;
use ec2::Client;

use crate::model::{
    Instance, InstanceId, InstanceState, Snapshot, SnapshotId, Tags, Volume, VolumeId,
};
use crate::provider::{Provider, ProviderError};

/// EC2-backed implementation of the provider boundary.
pub struct Ec2Provider {
    client: Client,
}

impl Ec2Provider {
    pub fn new(config: &SdkConfig, region: Option<Region>) -> Self {
        let conf = Builder::from(config).region(region).build();
        Self {
            client: Client::from_conf(conf),
        }
    }

    async fn fetch_instances(&self) -> Result<Vec<ec2::types::Instance>, ProviderError> {
        let resp = self
            .client
            .describe_instances()
            .send()
            .await
            .map_err(ProviderError::api)?;
        Ok(resp
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .cloned()
            .collect())
    }

    /// One batched volume query for the whole fleet, grouped by owning
    /// instance, with snapshot history attached.
    async fn fetch_volumes(
        &self,
        instance_ids: &[String],
    ) -> Result<HashMap<InstanceId, Vec<Volume>>, ProviderError> {
        if instance_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = Filter::builder()
            .name("attachment.instance-id")
            .set_values(Some(instance_ids.to_vec()))
            .build();
        let resp = self
            .client
            .describe_volumes()
            .filters(filter)
            .send()
            .await
            .map_err(ProviderError::api)?;
        let raw = resp.volumes().unwrap_or_default().to_vec();

        let volume_ids: Vec<String> = raw
            .iter()
            .filter_map(|volume| volume.volume_id().map(str::to_string))
            .collect();
        let mut snapshots = self.fetch_snapshots(&volume_ids).await?;

        let mut by_instance: HashMap<InstanceId, Vec<Volume>> = HashMap::new();
        for volume in raw {
            let Some(id) = volume.volume_id() else { continue };
            let Some(owner) = volume
                .attachments()
                .unwrap_or_default()
                .iter()
                .find_map(|attachment| attachment.instance_id())
            else {
                continue;
            };
            let id = VolumeId::new(id);
            let history = snapshots.remove(&id).unwrap_or_default();
            by_instance
                .entry(InstanceId::new(owner))
                .or_default()
                .push(Volume {
                    id,
                    instance_id: InstanceId::new(owner),
                    state: volume
                        .state()
                        .map(|state| state.as_str().to_string())
                        .unwrap_or_default(),
                    size_gib: volume.size().unwrap_or_default(),
                    encrypted: volume.encrypted().unwrap_or_default(),
                    snapshots: history,
                });
        }
        Ok(by_instance)
    }

    async fn fetch_snapshots(
        &self,
        volume_ids: &[String],
    ) -> Result<HashMap<VolumeId, Vec<Snapshot>>, ProviderError> {
        if volume_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = Filter::builder()
            .name("volume-id")
            .set_values(Some(volume_ids.to_vec()))
            .build();
        let resp = self
            .client
            .describe_snapshots()
            .filters(filter)
            .send()
            .await
            .map_err(ProviderError::api)?;

        let mut by_volume: HashMap<VolumeId, Vec<Snapshot>> = HashMap::new();
        for snapshot in resp.snapshots().unwrap_or_default() {
            if let Some(snapshot) = convert_snapshot(snapshot)? {
                by_volume
                    .entry(snapshot.volume_id.clone())
                    .or_default()
                    .push(snapshot);
            }
        }
        Ok(by_volume
            .into_iter()
            .map(|(id, history)| (id, newest_first(history)))
            .collect())
    }
}

#[async_trait]
impl Provider for Ec2Provider {
    async fn instances(&self) -> Result<Vec<Instance>, ProviderError> {
        let raw = self.fetch_instances().await?;
        let ids: Vec<String> = raw
            .iter()
            .filter_map(|instance| instance.instance_id().map(str::to_string))
            .collect();
        let mut volumes = self.fetch_volumes(&ids).await?;

        let mut fleet = Vec::with_capacity(raw.len());
        for instance in &raw {
            let owned = instance
                .instance_id()
                .and_then(|id| volumes.remove(&InstanceId::new(id)))
                .unwrap_or_default();
            if let Some(instance) = convert_instance(instance, owned)? {
                fleet.push(instance);
            }
        }
        Ok(fleet)
    }

    async fn instance_state(&self, id: &InstanceId) -> Result<InstanceState, ProviderError> {
        let resp = self
            .client
            .describe_instances()
            .set_instance_ids(Some(vec![id.to_string()]))
            .send()
            .await
            .map_err(ProviderError::api)?;
        let instance = resp
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .next()
            .ok_or_else(|| ProviderError::Api(format!("no such instance: {id}")))?;
        instance_state_of(instance)
    }

    async fn stop_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.client
            .stop_instances()
            .set_instance_ids(Some(vec![id.to_string()]))
            .send()
            .await
            .map_err(ProviderError::api)?;
        Ok(())
    }

    async fn start_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.client
            .start_instances()
            .set_instance_ids(Some(vec![id.to_string()]))
            .send()
            .await
            .map_err(ProviderError::api)?;
        Ok(())
    }

    async fn reboot_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.client
            .reboot_instances()
            .set_instance_ids(Some(vec![id.to_string()]))
            .send()
            .await
            .map_err(ProviderError::api)?;
        Ok(())
    }

    async fn create_snapshot(
        &self,
        volume: &VolumeId,
        description: &str,
    ) -> Result<SnapshotId, ProviderError> {
        let resp = self
            .client
            .create_snapshot()
            .volume_id(volume.to_string())
            .description(description)
            .send()
            .await
            .map_err(ProviderError::api)?;
        let id = resp
            .snapshot_id()
            .ok_or_else(|| ProviderError::Api("create_snapshot returned no snapshot id".into()))?;
        Ok(SnapshotId::new(id))
    }
}

fn convert_instance(
    instance: &ec2::types::Instance,
    volumes: Vec<Volume>,
) -> Result<Option<Instance>, ProviderError> {
    // anonymous entries in a reservation are unusable, drop them
    let Some(id) = instance.instance_id() else {
        return Ok(None);
    };
    let tags = Tags::from_pairs(
        instance
            .tags()
            .unwrap_or_default()
            .iter()
            .filter_map(|tag| Some((tag.key()?, tag.value()?))),
    );
    Ok(Some(Instance {
        id: InstanceId::new(id),
        instance_type: instance
            .instance_type()
            .map(|ty| ty.as_str().to_string())
            .unwrap_or_default(),
        availability_zone: instance
            .placement()
            .and_then(|placement| placement.availability_zone())
            .unwrap_or_default()
            .to_string(),
        state: instance_state_of(instance)?,
        public_dns_name: instance.public_dns_name().unwrap_or_default().to_string(),
        tags,
        volumes,
    }))
}

fn convert_snapshot(snapshot: &ec2::types::Snapshot) -> Result<Option<Snapshot>, ProviderError> {
    let Some(id) = snapshot.snapshot_id() else {
        return Ok(None);
    };
    let Some(volume_id) = snapshot.volume_id() else {
        return Ok(None);
    };
    let state = snapshot
        .state()
        .map(|state| state.as_str())
        .ok_or_else(|| ProviderError::Api(format!("snapshot {id} has no state")))?
        .parse()
        .map_err(ProviderError::api)?;
    Ok(Some(Snapshot {
        id: SnapshotId::new(id),
        volume_id: VolumeId::new(volume_id),
        state,
        progress: snapshot.progress().unwrap_or_default().to_string(),
        started_at: snapshot.start_time().and_then(chrono_time),
        description: snapshot.description().unwrap_or_default().to_string(),
    }))
}

fn instance_state_of(instance: &ec2::types::Instance) -> Result<InstanceState, ProviderError> {
    instance
        .state()
        .and_then(|state| state.name())
        .map(|name| name.as_str())
        .ok_or_else(|| {
            ProviderError::Api(format!(
                "instance {} has no state",
                instance.instance_id().unwrap_or("<unknown>")
            ))
        })?
        .parse()
        .map_err(ProviderError::api)
}

fn chrono_time(at: &SdkDateTime) -> Option<DateTime<Local>> {
    SystemTime::try_from(*at).ok().map(DateTime::from)
}

fn newest_first(mut history: Vec<Snapshot>) -> Vec<Snapshot> {
    history.sort_by_key(|snapshot| std::cmp::Reverse(snapshot.started_at));
    history
}

#[cfg(test)]
mod tests {
    use ec2::types::{InstanceStateName, InstanceType, Placement, Tag};

    use super::*;
    use crate::model::SnapshotState;

    fn sdk_instance() -> ec2::types::Instance {
        ec2::types::Instance::builder()
            .instance_id("i-1")
            .instance_type(InstanceType::T2Micro)
            .placement(Placement::builder().availability_zone("us-east-1a").build())
            .state(
                ec2::types::InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .public_dns_name("ec2-52-3-240-75.compute-1.amazonaws.com")
            .tags(Tag::builder().key("Project").value("valhalla").build())
            .build()
    }

    fn sdk_snapshot(id: &str, secs: i64) -> ec2::types::Snapshot {
        ec2::types::Snapshot::builder()
            .snapshot_id(id)
            .volume_id("vol-1")
            .state(ec2::types::SnapshotState::Completed)
            .progress("100%")
            .start_time(SdkDateTime::from_secs(secs))
            .build()
    }

    #[test]
    fn converts_tags_placement_and_state() {
        let instance = convert_instance(&sdk_instance(), vec![]).unwrap().unwrap();
        assert_eq!(instance.id, InstanceId::new("i-1"));
        assert_eq!(instance.instance_type, "t2.micro");
        assert_eq!(instance.availability_zone, "us-east-1a");
        assert_eq!(instance.state, InstanceState::Running);
        assert_eq!(instance.tags.project(), Some("valhalla"));
    }

    #[test]
    fn instances_without_an_id_are_dropped() {
        let anonymous = ec2::types::Instance::builder().build();
        assert!(convert_instance(&anonymous, vec![]).unwrap().is_none());
    }

    #[test]
    fn snapshot_conversion_keeps_state_and_progress() {
        let raw = ec2::types::Snapshot::builder()
            .snapshot_id("snap-1")
            .volume_id("vol-1")
            .state(ec2::types::SnapshotState::Pending)
            .progress("45%")
            .build();
        let snapshot = convert_snapshot(&raw).unwrap().unwrap();
        assert_eq!(snapshot.state, SnapshotState::Pending);
        assert_eq!(snapshot.progress, "45%");
        assert_eq!(snapshot.started_at, None);
    }

    #[test]
    fn snapshot_history_is_ordered_newest_first() {
        let older = convert_snapshot(&sdk_snapshot("snap-old", 1_600_000_000))
            .unwrap()
            .unwrap();
        let newer = convert_snapshot(&sdk_snapshot("snap-new", 1_650_000_000))
            .unwrap()
            .unwrap();

        let history = newest_first(vec![older.clone(), newer.clone()]);
        assert_eq!(history[0].id, newer.id);
        assert_eq!(history[1].id, older.id);
    }
}
