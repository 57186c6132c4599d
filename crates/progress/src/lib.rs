//! Progress tracking for the Buildboard.
//!
//! Status resolution, optimistic mutations, remote synchronization and the
//! dashboard aggregates built on top of them.

#![warn(missing_docs)]

pub mod resolve;
pub mod aggregates;
pub mod config;
pub mod error;
pub mod sync;
mod writer;
pub mod engine;
pub mod session;

#[cfg(test)]
mod test_support;

pub use resolve::{resolve_signed_out, resolve_status};
pub use aggregates::{ProgressSummary, SkillCoverage, ToolUsage};
pub use config::EngineConfig;
pub use error::{ProgressError, SyncError};
pub use sync::{merge_rows, LoadTicket};
pub use engine::ProgressEngine;
pub use session::SessionBinding;
