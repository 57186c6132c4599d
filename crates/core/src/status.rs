//! Project status: what is stored on a progress entry and what is shown.

use serde::{Deserialize, Serialize};

/// Status as displayed, in increasing order of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Locked,
    Unlocked,
    InProgress,
    Completed,
}

impl ProjectStatus {
    /// Whether the learner can open and work on the project.
    pub fn is_reachable(self) -> bool {
        !matches!(self, ProjectStatus::Locked)
    }

    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Locked => "locked",
            ProjectStatus::Unlocked => "unlocked",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status written on a progress entry.
///
/// `Unlocked` is the placeholder for entries created by notes or artifacts;
/// it carries no progress and defers to the unlock rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Unlocked,
    InProgress,
    Completed,
}

impl EntryStatus {
    /// The explicit milestone this status records, if any.
    pub fn milestone(self) -> Option<Milestone> {
        match self {
            EntryStatus::Unlocked => None,
            EntryStatus::InProgress => Some(Milestone::InProgress),
            EntryStatus::Completed => Some(Milestone::Completed),
        }
    }

    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Unlocked => "unlocked",
            EntryStatus::InProgress => "in_progress",
            EntryStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unlocked" => Ok(EntryStatus::Unlocked),
            "in_progress" => Ok(EntryStatus::InProgress),
            "completed" => Ok(EntryStatus::Completed),
            other => Err(format!("unknown entry status: {}", other)),
        }
    }
}

/// Progress explicitly recorded by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    InProgress,
    Completed,
}

/// Status computed from the sequential unlock rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Locked,
    Unlocked,
}

/// Result of status resolution, tagged by where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedStatus {
    /// Read from the entry as-is
    Stored(Milestone),
    /// Filled in by the unlock rule
    Derived(Gate),
}

impl ResolvedStatus {
    /// Flatten to the displayed status.
    pub fn status(self) -> ProjectStatus {
        match self {
            ResolvedStatus::Stored(Milestone::Completed) => ProjectStatus::Completed,
            ResolvedStatus::Stored(Milestone::InProgress) => ProjectStatus::InProgress,
            ResolvedStatus::Derived(Gate::Unlocked) => ProjectStatus::Unlocked,
            ResolvedStatus::Derived(Gate::Locked) => ProjectStatus::Locked,
        }
    }

    /// Whether the value came from stored progress.
    pub fn is_stored(self) -> bool {
        matches!(self, ResolvedStatus::Stored(_))
    }
}

impl From<ResolvedStatus> for ProjectStatus {
    fn from(resolved: ResolvedStatus) -> Self {
        resolved.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(ProjectStatus::Locked < ProjectStatus::Unlocked);
        assert!(ProjectStatus::Unlocked < ProjectStatus::InProgress);
        assert!(ProjectStatus::InProgress < ProjectStatus::Completed);
        assert!(EntryStatus::Unlocked < EntryStatus::Completed);
    }

    #[test]
    fn test_entry_status_wire_names() {
        assert_eq!(serde_json::to_string(&EntryStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!("completed".parse::<EntryStatus>().unwrap(), EntryStatus::Completed);
        assert!("locked".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn test_resolved_flattening() {
        assert_eq!(ResolvedStatus::Derived(Gate::Locked).status(), ProjectStatus::Locked);
        assert_eq!(
            ResolvedStatus::Stored(Milestone::InProgress).status(),
            ProjectStatus::InProgress
        );
        assert!(ResolvedStatus::Stored(Milestone::Completed).is_stored());
        assert!(!ResolvedStatus::Derived(Gate::Unlocked).is_stored());
        assert_eq!(EntryStatus::Unlocked.milestone(), None);
    }
}
