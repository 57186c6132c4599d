//! Buildboard core data models.
//!
//! This crate defines the project catalog and the per-user progress
//! records that the rest of the workspace reads and mutates.

#![warn(missing_docs)]

mod id;
mod project;
mod catalog;
mod status;
mod progress;
mod activity;
mod user;

pub use id::{ArtifactId, EventId, ProjectId, UserId};
pub use project::{Project, ProjectLevel, Resource};
pub use catalog::{Catalog, CatalogError};
pub use status::{EntryStatus, Gate, Milestone, ProjectStatus, ResolvedStatus};
pub use progress::{Artifact, ProgressEntry, UserProgress};
pub use activity::{ActivityEvent, ActivityKind, ActivityLog};
pub use user::User;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
