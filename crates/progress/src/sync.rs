//! Loading a user's rows and folding them into progress state.

use std::collections::HashSet;

use buildboard_core::{ActivityEvent, ActivityLog, ArtifactId, UserId, UserProgress};
use buildboard_storage::{ArtifactRow, ProgressRow, ProgressStore, Table};
use tracing::warn;

use crate::error::SyncError;

/// A load bound to the identity that requested it.
///
/// Issued by [`ProgressEngine::bind`](crate::ProgressEngine::bind); a ticket
/// whose generation is no longer current when its reads finish is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub(crate) generation: u64,
    pub(crate) user_id: UserId,
}

impl LoadTicket {
    /// User the load is for.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Remote state as assembled from whatever reads succeeded.
#[derive(Debug, Default)]
pub(crate) struct RemoteState {
    pub(crate) progress: UserProgress,
    pub(crate) activity: ActivityLog,
    pub(crate) failures: Vec<SyncError>,
}

/// Build the progress map from progress rows, then fold artifact rows in.
///
/// Artifact rows are appended in the order given; a project with artifacts
/// but no progress row gets a default `unlocked` entry.
pub fn merge_rows(progress: Vec<ProgressRow>, artifacts: Vec<ArtifactRow>) -> UserProgress {
    let mut map: UserProgress = progress.into_iter().map(ProgressRow::into_entry).collect();
    for row in artifacts {
        let (project_id, artifact) = row.into_artifact();
        map.entry(project_id).or_default().artifacts.push(artifact);
    }
    map
}

/// Issue the three reads concurrently and merge what came back.
pub(crate) async fn fetch_remote(store: &dyn ProgressStore, user: &UserId) -> RemoteState {
    let (progress, artifacts, activity) = tokio::join!(
        store.list_progress(user),
        store.list_artifacts(user),
        store.list_activity(user),
    );

    let mut failures = Vec::new();
    let progress = rows_or_empty(Table::Progress, progress, &mut failures);
    let artifacts = rows_or_empty(Table::Artifacts, artifacts, &mut failures);
    let activity = rows_or_empty(Table::Activity, activity, &mut failures);

    RemoteState {
        progress: merge_rows(progress, artifacts),
        activity: ActivityLog::from_newest_first(activity.into_iter().map(ActivityEvent::from)),
        failures,
    }
}

fn rows_or_empty<T>(
    table: Table,
    result: buildboard_storage::Result<Vec<T>>,
    failures: &mut Vec<SyncError>,
) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(%table, error = %e, "load failed");
            failures.push(SyncError::Load {
                table,
                message: e.to_string(),
            });
            Vec::new()
        }
    }
}

/// Fold remote state into local state. Local-only entries survive; entries
/// on both sides are reconciled. Artifacts in `removed` were deleted locally
/// and are dropped from the remote side even if their rows still exist.
pub(crate) fn apply_remote(
    local: &mut UserProgress,
    activity: &mut ActivityLog,
    remote: RemoteState,
    removed: &HashSet<ArtifactId>,
) {
    for (project_id, mut remote_entry) in remote.progress {
        remote_entry.artifacts.retain(|a| !removed.contains(&a.id));
        let merged = match local.get(&project_id) {
            Some(local_entry) => local_entry.reconcile(&remote_entry),
            None => remote_entry,
        };
        local.insert(project_id, merged);
    }

    if activity.is_empty() {
        *activity = remote.activity;
    } else {
        activity.merge(&remote.activity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildboard_core::{ActivityKind, Artifact, EntryStatus, EventId, ProgressEntry, ProjectId};
    use buildboard_storage::{ActivityRow, MemoryStore};
    use chrono::{Duration, Utc};

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn artifact_row(project: &str, url: &str, minutes_ago: i64) -> ArtifactRow {
        ArtifactRow {
            id: ArtifactId::new(),
            project_id: project.into(),
            url: url.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_merge_rows_creates_placeholder_for_orphan_artifacts() {
        let progress = vec![ProgressRow {
            project_id: "p1".into(),
            status: EntryStatus::Completed,
            started_at: None,
            completed_at: None,
            notes: "done".to_string(),
        }];
        let artifacts = vec![
            artifact_row("p1", "https://one", 3),
            artifact_row("p2", "https://two", 2),
            artifact_row("p1", "https://three", 1),
        ];

        let map = merge_rows(progress, artifacts);
        assert_eq!(map[&ProjectId::from("p1")].artifact_urls(), vec!["https://one", "https://three"]);
        assert_eq!(map[&ProjectId::from("p1")].notes, "done");

        let orphan = &map[&ProjectId::from("p2")];
        assert_eq!(orphan.status, EntryStatus::Unlocked);
        assert_eq!(orphan.artifact_urls(), vec!["https://two"]);
    }

    #[tokio::test]
    async fn test_fetch_keeps_partial_state_on_failure() {
        let store = MemoryStore::new();
        store
            .insert_artifact(&user(), &artifact_row("p1", "https://kept", 1))
            .await
            .unwrap();
        store
            .insert_activity(
                &user(),
                &ActivityRow {
                    id: EventId::new(),
                    project_id: "p1".into(),
                    kind: ActivityKind::Started,
                    timestamp: Utc::now(),
                },
            )
            .await
            .unwrap();
        store.set_unavailable(Table::Progress, true).await;

        let remote = fetch_remote(&store, &user()).await;
        assert_eq!(remote.failures.len(), 1);
        assert!(matches!(remote.failures[0], SyncError::Load { table: Table::Progress, .. }));
        assert_eq!(remote.progress[&ProjectId::from("p1")].artifact_urls(), vec!["https://kept"]);
        assert_eq!(remote.activity.len(), 1);
    }

    #[test]
    fn test_apply_remote_keeps_local_changes() {
        let mut local = UserProgress::new();
        local.insert(
            "p1".into(),
            ProgressEntry {
                status: EntryStatus::Completed,
                ..Default::default()
            },
        );
        local.insert("p3".into(), ProgressEntry::default());

        let mut remote = RemoteState::default();
        remote.progress.insert(
            "p1".into(),
            ProgressEntry {
                status: EntryStatus::InProgress,
                notes: "remote".to_string(),
                ..Default::default()
            },
        );
        remote.progress.insert("p2".into(), ProgressEntry::default());

        let mut activity = ActivityLog::new();
        apply_remote(&mut local, &mut activity, remote, &HashSet::new());

        assert_eq!(local.len(), 3);
        assert_eq!(local[&ProjectId::from("p1")].status, EntryStatus::Completed);
        assert_eq!(local[&ProjectId::from("p1")].notes, "remote");
    }

    #[test]
    fn test_apply_remote_skips_removed_artifacts() {
        let kept = Artifact::new("https://kept", Utc::now());
        let removed = Artifact::new("https://removed", Utc::now());

        let mut local = UserProgress::new();
        local.insert(
            "p1".into(),
            ProgressEntry {
                artifacts: vec![kept.clone()],
                ..Default::default()
            },
        );

        let mut remote = RemoteState::default();
        remote.progress.insert(
            "p1".into(),
            ProgressEntry {
                artifacts: vec![kept.clone(), removed.clone()],
                ..Default::default()
            },
        );

        let mut activity = ActivityLog::new();
        apply_remote(&mut local, &mut activity, remote, &HashSet::from([removed.id]));

        assert_eq!(local[&ProjectId::from("p1")].artifacts, vec![kept]);
    }
}
