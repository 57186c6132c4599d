//! Project model - one square on the board.

use serde::{Deserialize, Serialize};
use crate::id::ProjectId;

/// A project the learner works through. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// 1-based position on the board
    pub step_index: u32,

    /// Title
    pub title: String,

    /// Difficulty level
    pub level: ProjectLevel,

    /// The problem this project addresses
    pub problem: String,

    /// What the learner is asked to do
    pub task: String,

    /// Tools used, in display order
    pub tools: Vec<String>,

    /// Skills practised, in display order
    pub skills: Vec<String>,

    /// Expected deliverables
    pub deliverables: Vec<String>,

    /// "Try it" instructions
    pub try_steps: Vec<String>,

    /// Reference material
    pub resources: Vec<Resource>,
}

impl Project {
    /// Whether this is the entry point of the board.
    pub fn is_first_step(&self) -> bool {
        self.step_index == 1
    }

    /// Case-insensitive match against title, skills and tools.
    ///
    /// `query` must already be lower-cased.
    pub(crate) fn matches_lowercase(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(query)
            || self.skills.iter().any(|s| s.to_lowercase().contains(query))
            || self.tools.iter().any(|t| t.to_lowercase().contains(query))
    }
}

/// Difficulty levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for ProjectLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectLevel::Beginner => write!(f, "Beginner"),
            ProjectLevel::Intermediate => write!(f, "Intermediate"),
            ProjectLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

/// A labelled link to reference material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Link text
    pub label: String,

    /// Target URL
    pub url: String,
}
