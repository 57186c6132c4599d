//! JSON file storage implementation.
//!
//! Stores one JSON file per row under `<root>/users/<user>/<table>/`.
//! Directory and file names are hex-encoded so opaque user and project
//! identifiers never escape the data directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use buildboard_core::{ArtifactId, ProjectId, UserId};
use tokio::fs;
use tracing::debug;

use crate::rows::{ActivityRow, ArtifactRow, ProgressRow};
use crate::trait_::{ProgressStore, Result, Table};

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("users")).await?;
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, user: &UserId, table: Table) -> PathBuf {
        self.root
            .join("users")
            .join(hex::encode(user.as_str()))
            .join(table.as_str())
    }

    fn progress_path(&self, user: &UserId, project_id: &ProjectId) -> PathBuf {
        self.table_dir(user, Table::Progress)
            .join(format!("{}.json", hex::encode(project_id.as_str())))
    }

    fn artifact_path(&self, user: &UserId, id: ArtifactId) -> PathBuf {
        self.table_dir(user, Table::Artifacts).join(format!("{}.json", id))
    }

    fn activity_path(&self, user: &UserId, row: &ActivityRow) -> PathBuf {
        self.table_dir(user, Table::Activity).join(format!("{}.json", row.id))
    }
}

#[async_trait]
impl ProgressStore for JsonStore {
    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRow>> {
        list_dir(&self.table_dir(user, Table::Progress)).await
    }

    async fn upsert_progress(&self, user: &UserId, row: &ProgressRow) -> Result<()> {
        write_json(&self.progress_path(user, &row.project_id), row).await
    }

    async fn list_artifacts(&self, user: &UserId) -> Result<Vec<ArtifactRow>> {
        let mut rows: Vec<ArtifactRow> = list_dir(&self.table_dir(user, Table::Artifacts)).await?;
        // ULIDs break ties between rows created in the same instant
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(rows)
    }

    async fn insert_artifact(&self, user: &UserId, row: &ArtifactRow) -> Result<()> {
        write_json(&self.artifact_path(user, row.id), row).await
    }

    async fn delete_artifact(&self, user: &UserId, project_id: &ProjectId, id: ArtifactId) -> Result<()> {
        let path = self.artifact_path(user, id);
        let Some(row) = read_json::<ArtifactRow>(&path).await? else {
            return Ok(());
        };
        if &row.project_id != project_id {
            debug!(artifact = %id, "artifact belongs to another project, not deleting");
            return Ok(());
        }
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_activity(&self, user: &UserId) -> Result<Vec<ActivityRow>> {
        let mut rows: Vec<ActivityRow> = list_dir(&self.table_dir(user, Table::Activity)).await?;
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn insert_activity(&self, user: &UserId, row: &ActivityRow) -> Result<()> {
        write_json(&self.activity_path(user, row), row).await
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(item) = read_json(&entry.path()).await? {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildboard_core::{ActivityKind, EntryStatus, EventId};
    use chrono::Utc;

    fn user() -> UserId {
        UserId::new("auth0|user/../1")
    }

    #[tokio::test]
    async fn test_progress_round_trip_and_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();

        let mut row = ProgressRow {
            project_id: "problem-discovery".into(),
            status: EntryStatus::InProgress,
            started_at: Some(Utc::now()),
            completed_at: None,
            notes: "first".to_string(),
        };
        store.upsert_progress(&user(), &row).await.unwrap();
        row.status = EntryStatus::Completed;
        store.upsert_progress(&user(), &row).await.unwrap();

        let rows = store.list_progress(&user()).await.unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();

        assert!(store.list_progress(&user()).await.unwrap().is_empty());
        assert!(store.list_artifacts(&user()).await.unwrap().is_empty());
        assert!(store.list_activity(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_ids_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let path = store.table_dir(&user(), Table::Progress);
        assert!(path.starts_with(dir.path().join("users")));
        assert_eq!(path.parent().unwrap().parent().unwrap(), dir.path().join("users"));
    }

    #[tokio::test]
    async fn test_artifact_delete_checks_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let row = ArtifactRow {
            id: ArtifactId::new(),
            project_id: "a".into(),
            url: "https://example.com".to_string(),
            created_at: Utc::now(),
        };
        store.insert_artifact(&user(), &row).await.unwrap();

        store.delete_artifact(&user(), &"b".into(), row.id).await.unwrap();
        assert_eq!(store.list_artifacts(&user()).await.unwrap().len(), 1);

        store.delete_artifact(&user(), &"a".into(), row.id).await.unwrap();
        assert!(store.list_artifacts(&user()).await.unwrap().is_empty());

        // deleting again is fine
        store.delete_artifact(&user(), &"a".into(), row.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_activity_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let now = Utc::now();

        for (kind, ts) in [
            (ActivityKind::Started, now - chrono::Duration::hours(1)),
            (ActivityKind::Completed, now),
        ] {
            let row = ActivityRow {
                id: EventId::new(),
                project_id: "a".into(),
                kind,
                timestamp: ts,
            };
            store.insert_activity(&user(), &row).await.unwrap();
        }

        let rows = store.list_activity(&user()).await.unwrap();
        assert_eq!(rows[0].kind, ActivityKind::Completed);
        assert_eq!(rows[1].kind, ActivityKind::Started);
    }
}
