//! Per-user, per-project progress entries.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::id::{ArtifactId, ProjectId};
use crate::status::EntryStatus;
use crate::Time;

/// Progress of one signed-in user, keyed by project.
pub type UserProgress = HashMap<ProjectId, ProgressEntry>;

/// A link the learner attached to a project as evidence of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable row identity, used for deletion
    pub id: ArtifactId,

    /// Where the artifact lives
    pub url: String,

    /// When it was added
    pub created_at: Time,
}

impl Artifact {
    /// New artifact stamped with a fresh id.
    pub fn new(url: impl Into<String>, created_at: Time) -> Self {
        Self {
            id: ArtifactId::new(),
            url: url.into(),
            created_at,
        }
    }
}

/// Mutable record for a project the user has touched.
///
/// Always held in normalized shape: a missing status is `Unlocked`, missing
/// timestamps are `None`, missing notes are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Stored status
    pub status: EntryStatus,

    /// First time the project was started
    pub started_at: Option<Time>,

    /// Last time the project was completed
    pub completed_at: Option<Time>,

    /// Free-text notes
    pub notes: String,

    /// Artifacts in insertion order
    pub artifacts: Vec<Artifact>,
}

impl ProgressEntry {
    /// Artifact URLs in display order.
    pub fn artifact_urls(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.url.as_str()).collect()
    }

    /// Whether the stored status is `Completed`.
    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }

    /// Merge a freshly loaded remote entry into this local one.
    ///
    /// Progress never regresses, so the more advanced status wins.
    /// `started_at` keeps the earliest value and `completed_at` the latest.
    /// Local notes win unless they are empty. Artifacts keep local order,
    /// followed by remote artifacts not known locally.
    pub fn reconcile(&self, remote: &ProgressEntry) -> ProgressEntry {
        let started_at = match (self.started_at, remote.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let completed_at = match (self.completed_at, remote.completed_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let notes = if self.notes.is_empty() {
            remote.notes.clone()
        } else {
            self.notes.clone()
        };

        let known: HashSet<ArtifactId> = self.artifacts.iter().map(|a| a.id).collect();
        let mut artifacts = self.artifacts.clone();
        artifacts.extend(
            remote
                .artifacts
                .iter()
                .filter(|a| !known.contains(&a.id))
                .cloned(),
        );

        ProgressEntry {
            status: self.status.max(remote.status),
            started_at,
            completed_at,
            notes,
            artifacts,
        }
    }
}
