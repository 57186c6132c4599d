//! Persistence for Buildboard progress.
//!
//! This crate provides the per-user row-store interface the progress engine
//! writes through, with an in-process and a JSON-file implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod rows;
pub mod memory;
pub mod json_storage;

pub use trait_::{ProgressStore, StorageError, Result, Table};
pub use rows::{ActivityRow, ArtifactRow, ProgressRow};
pub use memory::MemoryStore;
pub use json_storage::JsonStore;
