//! Error types for the progress engine.

use std::time::Duration;

use buildboard_core::ProjectId;
use buildboard_storage::Table;

/// Rejections of mutation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// No identity is bound to the engine
    #[error("not signed in")]
    NotSignedIn,

    /// The id is not in the catalog
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),

    /// The unlock rule does not allow reaching this project yet
    #[error("project {0} is locked")]
    Locked(ProjectId),
}

/// Background synchronization failures.
///
/// Local state is kept as-is when these happen; they are reported so the
/// presentation layer can tell the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// One of the three load reads failed
    #[error("failed to load {table} rows: {message}")]
    Load {
        /// Table that failed
        table: Table,
        /// Storage error text
        message: String,
    },

    /// The load as a whole did not finish in time
    #[error("load timed out after {0:?}")]
    LoadTimeout(Duration),

    /// A write gave up after all retries
    #[error("failed to write {table} row for {project_id} after {attempts} attempts: {message}")]
    Write {
        /// Table written to
        table: Table,
        /// Project the row belongs to
        project_id: ProjectId,
        /// Attempts made
        attempts: u32,
        /// Last storage error text
        message: String,
    },
}
