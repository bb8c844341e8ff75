use crate::model::{Instance, SnapshotState, Volume};

/// Narrows an optional `--project` argument to a usable scope.
/// Absent or empty means the whole account.
pub fn project_scope(project: Option<&str>) -> Option<&str> {
    project.filter(|name| !name.is_empty())
}

/// Selects the instances a command operates on. A scoped call keeps only
/// instances whose tag set maps `Project` to exactly the given name.
pub fn filter_instances<'a>(fleet: &'a [Instance], project: Option<&str>) -> Vec<&'a Instance> {
    match project_scope(project) {
        Some(name) => fleet
            .iter()
            .filter(|instance| instance.tags.project() == Some(name))
            .collect(),
        None => fleet.iter().collect(),
    }
}

/// True when the newest snapshot of the volume is still copying.
/// Only the head of the history is inspected.
pub fn has_pending_snapshot(volume: &Volume) -> bool {
    volume
        .snapshots
        .first()
        .map_or(false, |snapshot| snapshot.state == SnapshotState::Pending)
}
