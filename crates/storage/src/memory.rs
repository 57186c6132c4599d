//! In-process storage backend.
//!
//! Keeps rows in memory and can simulate an unreliable backend: whole tables
//! can be marked unavailable, a number of upcoming writes can be made to
//! fail, and reads for a user can be delayed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use buildboard_core::{ArtifactId, ProjectId, UserId};
use tokio::sync::Mutex;

use crate::rows::{ActivityRow, ArtifactRow, ProgressRow};
use crate::trait_::{ProgressStore, Result, StorageError, Table};

#[derive(Debug, Default, Clone)]
struct UserTables {
    progress: HashMap<ProjectId, ProgressRow>,
    artifacts: Vec<ArtifactRow>,
    activity: Vec<ActivityRow>,
}

/// Memory-backed [`ProgressStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<UserId, UserTables>>,
    unavailable: Mutex<HashSet<Table>>,
    read_delays: Mutex<HashMap<UserId, Duration>>,
    failing_writes: AtomicU32,
    write_attempts: AtomicUsize,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write on `table` fail until restored.
    pub async fn set_unavailable(&self, table: Table, unavailable: bool) {
        let mut set = self.unavailable.lock().await;
        if unavailable {
            set.insert(table);
        } else {
            set.remove(&table);
        }
    }

    /// Fail the next `count` writes regardless of table.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Delay every read for `user` by `delay`.
    pub async fn set_read_delay(&self, user: &UserId, delay: Duration) {
        self.read_delays.lock().await.insert(user.clone(), delay);
    }

    /// Number of write calls received, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Progress row for (user, project), if stored.
    pub async fn progress_row(&self, user: &UserId, project_id: &ProjectId) -> Option<ProgressRow> {
        let tables = self.tables.lock().await;
        tables.get(user)?.progress.get(project_id).cloned()
    }

    async fn before_read(&self, user: &UserId, table: Table) -> Result<()> {
        let delay = self.read_delays.lock().await.get(user).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.lock().await.contains(&table) {
            return Err(StorageError::Unavailable(table));
        }
        Ok(())
    }

    async fn before_write(&self, table: Table) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let pending = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(StorageError::Unavailable(table));
        }
        if self.unavailable.lock().await.contains(&table) {
            return Err(StorageError::Unavailable(table));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRow>> {
        self.before_read(user, Table::Progress).await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .get(user)
            .map(|t| t.progress.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_progress(&self, user: &UserId, row: &ProgressRow) -> Result<()> {
        self.before_write(Table::Progress).await?;
        let mut tables = self.tables.lock().await;
        tables
            .entry(user.clone())
            .or_default()
            .progress
            .insert(row.project_id.clone(), row.clone());
        Ok(())
    }

    async fn list_artifacts(&self, user: &UserId) -> Result<Vec<ArtifactRow>> {
        self.before_read(user, Table::Artifacts).await?;
        let tables = self.tables.lock().await;
        let mut rows = tables
            .get(user)
            .map(|t| t.artifacts.clone())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn insert_artifact(&self, user: &UserId, row: &ArtifactRow) -> Result<()> {
        self.before_write(Table::Artifacts).await?;
        let mut tables = self.tables.lock().await;
        tables.entry(user.clone()).or_default().artifacts.push(row.clone());
        Ok(())
    }

    async fn delete_artifact(&self, user: &UserId, project_id: &ProjectId, id: ArtifactId) -> Result<()> {
        self.before_write(Table::Artifacts).await?;
        let mut tables = self.tables.lock().await;
        if let Some(t) = tables.get_mut(user) {
            t.artifacts.retain(|a| !(a.id == id && &a.project_id == project_id));
        }
        Ok(())
    }

    async fn list_activity(&self, user: &UserId) -> Result<Vec<ActivityRow>> {
        self.before_read(user, Table::Activity).await?;
        let tables = self.tables.lock().await;
        let mut rows = tables
            .get(user)
            .map(|t| t.activity.clone())
            .unwrap_or_default();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn insert_activity(&self, user: &UserId, row: &ActivityRow) -> Result<()> {
        self.before_write(Table::Activity).await?;
        let mut tables = self.tables.lock().await;
        tables.entry(user.clone()).or_default().activity.push(row.clone());
        Ok(())
    }
}
