//! Read-only row formatting for the list commands. Fields are joined with
//! a comma and a space, one row per entity.

use crate::model::{Instance, Snapshot, Volume};

pub fn instance_row(instance: &Instance) -> String {
    [
        instance.id.as_str(),
        instance.instance_type.as_str(),
        instance.availability_zone.as_str(),
        instance.state.as_str(),
        instance.public_dns_name.as_str(),
        instance.tags.project_or_default(),
    ]
    .join(", ")
}

pub fn volume_rows(instance: &Instance) -> Vec<String> {
    instance.volumes.iter().map(volume_row).collect()
}

fn volume_row(volume: &Volume) -> String {
    let size = format!("{}GiB", volume.size_gib);
    [
        volume.id.as_str(),
        volume.instance_id.as_str(),
        volume.state.as_str(),
        size.as_str(),
        if volume.encrypted {
            "Encrypted"
        } else {
            "Not Encrypted"
        },
    ]
    .join(", ")
}

/// Rows for a single instance's snapshots. By default only the newest
/// snapshot per volume is shown; `all` emits the full history.
pub fn snapshot_rows(instance: &Instance, all: bool) -> Vec<String> {
    let mut rows = Vec::new();
    for volume in &instance.volumes {
        let shown = if all { volume.snapshots.len() } else { 1 };
        for snapshot in volume.snapshots.iter().take(shown) {
            rows.push(snapshot_row(snapshot, volume, instance));
        }
    }
    rows
}

fn snapshot_row(snapshot: &Snapshot, volume: &Volume, instance: &Instance) -> String {
    let started = snapshot
        .started_at
        .map(|at| at.format("%c").to_string())
        .unwrap_or_default();
    [
        snapshot.id.as_str(),
        volume.id.as_str(),
        instance.id.as_str(),
        snapshot.state.as_str(),
        snapshot.progress.as_str(),
        started.as_str(),
    ]
    .join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::model::{Snapshot, SnapshotState, Volume};
    use crate::provider::mock;

    #[test]
    fn volume_rows_use_the_fixed_field_order() {
        let instance = mock::instance(
            "i-1",
            Some("valhalla"),
            vec![mock::volume("vol-1", "i-1", vec![])],
        );
        assert_eq!(
            volume_rows(&instance),
            vec!["vol-1, i-1, in-use, 8GiB, Not Encrypted"]
        );
    }

    #[test]
    fn encrypted_volumes_are_labelled() {
        let volume = Volume {
            encrypted: true,
            size_gib: 100,
            ..mock::volume("vol-9", "i-1", vec![])
        };
        let instance = mock::instance("i-1", None, vec![volume]);
        assert_eq!(
            volume_rows(&instance),
            vec!["vol-9, i-1, in-use, 100GiB, Encrypted"]
        );
    }

    #[test]
    fn instance_row_falls_back_when_untagged() {
        let instance = Instance {
            public_dns_name: "ec2-52-3-240-75.compute-1.amazonaws.com".to_string(),
            ..mock::instance("i-1", None, vec![])
        };
        assert_eq!(
            instance_row(&instance),
            "i-1, t2.micro, us-east-1a, running, \
             ec2-52-3-240-75.compute-1.amazonaws.com, <no project>"
        );
    }

    #[test]
    fn instance_row_shows_the_project_tag() {
        let instance = mock::instance("i-2", Some("valhalla"), vec![]);
        assert!(instance_row(&instance).ends_with(", valhalla"));
    }

    #[test]
    fn snapshot_rows_default_to_the_newest_per_volume() {
        let volume = mock::volume(
            "vol-1",
            "i-1",
            vec![
                mock::snapshot("snap-2", "vol-1", SnapshotState::Pending),
                mock::snapshot("snap-1", "vol-1", SnapshotState::Completed),
            ],
        );
        let instance = mock::instance("i-1", Some("valhalla"), vec![volume]);

        let newest_only = snapshot_rows(&instance, false);
        assert_eq!(newest_only.len(), 1);
        assert!(newest_only[0].starts_with("snap-2, vol-1, i-1, pending"));

        let full = snapshot_rows(&instance, true);
        assert_eq!(full.len(), 2);
        assert!(full[1].starts_with("snap-1, vol-1, i-1, completed"));
    }

    #[test]
    fn snapshot_row_carries_progress_and_start_time() {
        let started = Local.timestamp_opt(1_600_000_000, 0).unwrap();
        let snapshot = Snapshot {
            progress: "45%".to_string(),
            started_at: Some(started),
            ..mock::snapshot("snap-1", "vol-1", SnapshotState::Pending)
        };
        let volume = mock::volume("vol-1", "i-1", vec![snapshot]);
        let instance = mock::instance("i-1", None, vec![volume]);

        let rows = snapshot_rows(&instance, false);
        assert_eq!(
            rows,
            vec![format!(
                "snap-1, vol-1, i-1, pending, 45%, {}",
                started.format("%c")
            )]
        );
    }
}
