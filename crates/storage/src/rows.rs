//! Row shapes of the three tables and their mapping to core types.

use buildboard_core::{
    ActivityEvent, ActivityKind, Artifact, ArtifactId, EntryStatus, EventId, ProgressEntry,
    ProjectId, Time,
};
use serde::{Deserialize, Serialize};

/// Progress row. Artifacts live in their own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRow {
    /// Project key
    pub project_id: ProjectId,
    /// Stored status
    pub status: EntryStatus,
    /// Started timestamp
    pub started_at: Option<Time>,
    /// Completed timestamp
    pub completed_at: Option<Time>,
    /// Notes
    #[serde(default)]
    pub notes: String,
}

impl ProgressRow {
    /// Row for an entry, dropping its artifacts.
    pub fn from_entry(project_id: ProjectId, entry: &ProgressEntry) -> Self {
        Self {
            project_id,
            status: entry.status,
            started_at: entry.started_at,
            completed_at: entry.completed_at,
            notes: entry.notes.clone(),
        }
    }

    /// Normalized entry with no artifacts.
    pub fn into_entry(self) -> (ProjectId, ProgressEntry) {
        (
            self.project_id,
            ProgressEntry {
                status: self.status,
                started_at: self.started_at,
                completed_at: self.completed_at,
                notes: self.notes,
                artifacts: Vec::new(),
            },
        )
    }
}

/// Artifact row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRow {
    /// Row identity
    pub id: ArtifactId,
    /// Owning project
    pub project_id: ProjectId,
    /// Artifact link
    pub url: String,
    /// Insertion time, used for ordering
    pub created_at: Time,
}

impl ArtifactRow {
    /// Row for an artifact of `project_id`.
    pub fn from_artifact(project_id: ProjectId, artifact: &Artifact) -> Self {
        Self {
            id: artifact.id,
            project_id,
            url: artifact.url.clone(),
            created_at: artifact.created_at,
        }
    }

    /// Split into owning project and artifact.
    pub fn into_artifact(self) -> (ProjectId, Artifact) {
        (
            self.project_id,
            Artifact {
                id: self.id,
                url: self.url,
                created_at: self.created_at,
            },
        )
    }
}

/// Activity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRow {
    /// Row identity
    pub id: EventId,
    /// Project that changed
    pub project_id: ProjectId,
    /// Event type
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// When it happened
    pub timestamp: Time,
}

impl From<&ActivityEvent> for ActivityRow {
    fn from(event: &ActivityEvent) -> Self {
        Self {
            id: event.id,
            project_id: event.project_id.clone(),
            kind: event.kind,
            timestamp: event.timestamp,
        }
    }
}

impl From<ActivityRow> for ActivityEvent {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            kind: row.kind,
            timestamp: row.timestamp,
        }
    }
}
