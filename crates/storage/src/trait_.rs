//! Storage trait abstraction.

use async_trait::async_trait;
use buildboard_core::{ArtifactId, ProjectId, UserId};

use crate::rows::{ActivityRow, ArtifactRow, ProgressRow};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend could not be reached
    #[error("{0} store unavailable")]
    Unavailable(Table),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// The three logical tables, all scoped by user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// One row per (user, project)
    Progress,
    /// Insert/delete only
    Artifacts,
    /// Insert only
    Activity,
}

impl Table {
    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Progress => "progress",
            Table::Artifacts => "artifacts",
            Table::Activity => "activity",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user row store backing the progress engine.
///
/// Methods take `&self` so a single store can be shared behind an `Arc`
/// between the engine and its background writer.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    // === Progress rows ===

    /// All progress rows of a user, in no particular order.
    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRow>>;

    /// Insert or replace the row keyed by (user, project).
    async fn upsert_progress(&self, user: &UserId, row: &ProgressRow) -> Result<()>;

    // === Artifact rows ===

    /// All artifact rows of a user, oldest first.
    async fn list_artifacts(&self, user: &UserId) -> Result<Vec<ArtifactRow>>;

    /// Insert an artifact row.
    async fn insert_artifact(&self, user: &UserId, row: &ArtifactRow) -> Result<()>;

    /// Delete the artifact row matching (user, project, id). Missing rows are not an error.
    async fn delete_artifact(&self, user: &UserId, project_id: &ProjectId, id: ArtifactId) -> Result<()>;

    // === Activity rows ===

    /// All activity rows of a user, newest first.
    async fn list_activity(&self, user: &UserId) -> Result<Vec<ActivityRow>>;

    /// Insert an activity row.
    async fn insert_activity(&self, user: &UserId, row: &ActivityRow) -> Result<()>;
}
