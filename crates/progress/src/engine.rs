//! The progress engine.
//!
//! Owns one user's progress map and activity log. Reads are answered from
//! memory. Mutations apply to memory synchronously and queue their
//! persistence writes on the background writer; the remote store catches
//! up eventually and local state is never rolled back.

use std::collections::HashSet;
use std::sync::Arc;

use buildboard_core::{
    ActivityEvent, ActivityKind, ActivityLog, Artifact, ArtifactId, Catalog, EntryStatus, ProgressEntry,
    Project, ProjectId, ProjectStatus, ResolvedStatus, User, UserId, UserProgress,
};
use buildboard_storage::{ActivityRow, ArtifactRow, ProgressRow, ProgressStore};
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::aggregates::{self, ProgressSummary};
use crate::config::EngineConfig;
use crate::error::{ProgressError, SyncError};
use crate::resolve::{resolve_signed_out, resolve_status};
use crate::sync::{apply_remote, fetch_remote, LoadTicket};
use crate::writer::{WriteOp, WriteQueue};

/// Result type for mutations.
pub type Result<T> = std::result::Result<T, ProgressError>;

#[derive(Debug, Default)]
struct EngineState {
    user: Option<User>,
    /// Bumped on every identity change; loads carry the value they started with.
    generation: u64,
    progress: UserProgress,
    activity: ActivityLog,
    /// Artifacts removed this session; reloads never bring them back.
    removed_artifacts: HashSet<ArtifactId>,
    is_loading: bool,
}

impl EngineState {
    fn user_id(&self) -> Result<UserId> {
        self.user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(ProgressError::NotSignedIn)
    }

    fn resolve(&self, catalog: &Catalog, project_id: &ProjectId) -> ResolvedStatus {
        if self.user.is_some() {
            resolve_status(catalog, &self.progress, project_id)
        } else {
            resolve_signed_out(catalog, project_id)
        }
    }

    fn entry_or_default(&self, project_id: &ProjectId) -> ProgressEntry {
        self.progress.get(project_id).cloned().unwrap_or_default()
    }

    fn clear(&mut self) {
        self.progress.clear();
        self.activity.clear();
        self.removed_artifacts.clear();
    }
}

/// Per-session progress state manager.
///
/// Construct one per application and share it behind an `Arc`. Must be
/// created inside a Tokio runtime, since it spawns its background writer.
pub struct ProgressEngine {
    catalog: Arc<Catalog>,
    store: Arc<dyn ProgressStore>,
    config: EngineConfig,
    state: RwLock<EngineState>,
    writer: WriteQueue,
    errors: broadcast::Sender<SyncError>,
    changes: watch::Sender<u64>,
}

impl ProgressEngine {
    /// Create an engine with no identity bound.
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn ProgressStore>, config: EngineConfig) -> Self {
        let (errors, _) = broadcast::channel(config.error_channel_capacity.max(1));
        let writer = WriteQueue::spawn(store.clone(), config.clone(), errors.clone());
        let (changes, _) = watch::channel(0);
        Self {
            catalog,
            store,
            config,
            state: RwLock::new(EngineState::default()),
            writer,
            errors,
            changes,
        }
    }

    /// The catalog this engine resolves against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Receive background load/write failures.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SyncError> {
        self.errors.subscribe()
    }

    /// Receive a notification after every state change.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    // === Session ===

    /// React to an identity change.
    ///
    /// Signing out clears progress and activity immediately. Signing in as a
    /// different user clears them too and returns a ticket to pass to
    /// [`load`](Self::load). Re-binding the user already bound only updates
    /// the stored profile.
    pub fn bind(&self, user: Option<User>) -> Option<LoadTicket> {
        let ticket = {
            let mut state = self.state.write();
            match user {
                Some(user) if state.user.as_ref().is_some_and(|u| u.id == user.id) => {
                    state.user = Some(user);
                    None
                }
                Some(user) => {
                    state.generation += 1;
                    info!(user = %user.id, generation = state.generation, "identity bound");
                    let ticket = LoadTicket {
                        generation: state.generation,
                        user_id: user.id.clone(),
                    };
                    state.user = Some(user);
                    state.clear();
                    state.is_loading = true;
                    Some(ticket)
                }
                None => {
                    state.generation += 1;
                    if state.user.take().is_some() {
                        info!(generation = state.generation, "identity cleared");
                    }
                    state.clear();
                    state.is_loading = false;
                    None
                }
            }
        };
        self.notify();
        ticket
    }

    /// Bind `user` and wait for its rows to load.
    pub async fn sign_in(&self, user: User) {
        if let Some(ticket) = self.bind(Some(user)) {
            self.load(ticket).await;
        }
    }

    /// Unbind the current identity.
    pub fn sign_out(&self) {
        self.bind(None);
    }

    /// Read the ticket's rows and fold them into state, unless the identity
    /// changed while the reads were in flight.
    pub async fn load(&self, ticket: LoadTicket) {
        let timeout = self.config.load_timeout();
        let result = tokio::time::timeout(timeout, fetch_remote(self.store.as_ref(), &ticket.user_id)).await;

        {
            let mut state = self.state.write();
            if state.generation != ticket.generation {
                debug!(
                    user = %ticket.user_id,
                    stale = ticket.generation,
                    current = state.generation,
                    "discarding superseded load"
                );
                return;
            }
            state.is_loading = false;

            match result {
                Ok(mut remote) => {
                    for failure in remote.failures.drain(..) {
                        let _ = self.errors.send(failure);
                    }
                    let EngineState {
                        progress,
                        activity,
                        removed_artifacts,
                        ..
                    } = &mut *state;
                    apply_remote(progress, activity, remote, removed_artifacts);
                    info!(
                        user = %ticket.user_id,
                        entries = progress.len(),
                        events = activity.len(),
                        "progress loaded"
                    );
                }
                Err(_) => {
                    warn!(user = %ticket.user_id, ?timeout, "load timed out");
                    let _ = self.errors.send(SyncError::LoadTimeout(timeout));
                }
            }
        }
        self.notify();
    }

    /// Reload the bound user's rows and reconcile them into local state.
    ///
    /// Queued writes are flushed first so the reads see them.
    pub async fn refresh(&self) -> Result<()> {
        let ticket = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            state.is_loading = true;
            LoadTicket {
                generation: state.generation,
                user_id,
            }
        };
        self.notify();
        self.writer.flush().await;
        self.load(ticket).await;
        Ok(())
    }

    /// Wait until every write queued so far has been attempted.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    // === Reads ===

    /// The bound user.
    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    /// Resolved status with its provenance.
    pub fn resolve(&self, project_id: &ProjectId) -> ResolvedStatus {
        self.state.read().resolve(&self.catalog, project_id)
    }

    /// Resolved status.
    pub fn status(&self, project_id: &ProjectId) -> ProjectStatus {
        self.resolve(project_id).status()
    }

    /// Stored entry for a project.
    pub fn entry(&self, project_id: &ProjectId) -> Option<ProgressEntry> {
        self.state.read().progress.get(project_id).cloned()
    }

    /// Snapshot of the whole progress map.
    pub fn progress(&self) -> UserProgress {
        self.state.read().progress.clone()
    }

    /// Snapshot of the activity log, newest first.
    pub fn activity(&self) -> ActivityLog {
        self.state.read().activity.clone()
    }

    /// Entries stored as completed.
    pub fn completed_count(&self) -> usize {
        aggregates::completed_count(&self.state.read().progress)
    }

    /// Tools of completed projects.
    pub fn unique_tools(&self) -> Vec<String> {
        aggregates::unique_tools(&self.catalog, &self.state.read().progress)
    }

    /// Skills of completed projects.
    pub fn unique_skills(&self) -> Vec<String> {
        aggregates::unique_skills(&self.catalog, &self.state.read().progress)
    }

    /// First project that is unlocked or in progress.
    pub fn next_unlocked_project(&self) -> Option<&Project> {
        let state = self.state.read();
        aggregates::next_unlocked_project(&self.catalog, |id| state.resolve(&self.catalog, id).status())
    }

    /// Dashboard aggregates.
    pub fn summary(&self) -> ProgressSummary {
        let state = self.state.read();
        ProgressSummary::compute_with(&self.catalog, &state.progress, |id| {
            state.resolve(&self.catalog, id).status()
        })
    }

    // === Mutations ===

    fn project(&self, project_id: &ProjectId) -> Result<&Project> {
        self.catalog
            .get(project_id)
            .ok_or_else(|| ProgressError::UnknownProject(project_id.clone()))
    }

    /// Mark a project as in progress.
    ///
    /// Keeps an existing `started_at`. A completed project stays completed
    /// and nothing is recorded.
    pub fn start_project(&self, project_id: &ProjectId) -> Result<ProgressEntry> {
        self.project(project_id)?;
        let entry = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            let current = state.entry_or_default(project_id);
            if current.is_completed() {
                debug!(project = %project_id, "already completed, start ignored");
                return Ok(current);
            }
            if !state.resolve(&self.catalog, project_id).status().is_reachable() {
                return Err(ProgressError::Locked(project_id.clone()));
            }

            let now = Utc::now();
            let entry = ProgressEntry {
                status: EntryStatus::InProgress,
                started_at: current.started_at.or(Some(now)),
                ..current
            };
            let event = ActivityEvent::new(project_id.clone(), ActivityKind::Started, now);

            state.progress.insert(project_id.clone(), entry.clone());
            state.activity.record(event.clone());
            self.writer.submit(
                user_id,
                vec![
                    WriteOp::UpsertProgress(ProgressRow::from_entry(project_id.clone(), &entry)),
                    WriteOp::InsertActivity(ActivityRow::from(&event)),
                ],
            );
            entry
        };
        debug!(project = %project_id, "project started");
        self.notify();
        Ok(entry)
    }

    /// Mark a project as completed.
    ///
    /// `completed_at` is set to now on every call; `started_at` is kept or
    /// backfilled to now.
    pub fn complete_project(&self, project_id: &ProjectId) -> Result<ProgressEntry> {
        self.project(project_id)?;
        let entry = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            if !state.resolve(&self.catalog, project_id).status().is_reachable() {
                return Err(ProgressError::Locked(project_id.clone()));
            }

            let current = state.entry_or_default(project_id);
            let now = Utc::now();
            let entry = ProgressEntry {
                status: EntryStatus::Completed,
                started_at: current.started_at.or(Some(now)),
                completed_at: Some(now),
                ..current
            };
            let event = ActivityEvent::new(project_id.clone(), ActivityKind::Completed, now);

            state.progress.insert(project_id.clone(), entry.clone());
            state.activity.record(event.clone());
            self.writer.submit(
                user_id,
                vec![
                    WriteOp::UpsertProgress(ProgressRow::from_entry(project_id.clone(), &entry)),
                    WriteOp::InsertActivity(ActivityRow::from(&event)),
                ],
            );
            entry
        };
        debug!(project = %project_id, "project completed");
        self.notify();
        Ok(entry)
    }

    /// Replace a project's notes.
    pub fn save_notes(&self, project_id: &ProjectId, notes: impl Into<String>) -> Result<ProgressEntry> {
        self.project(project_id)?;
        let entry = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            let entry = ProgressEntry {
                notes: notes.into(),
                ..state.entry_or_default(project_id)
            };

            state.progress.insert(project_id.clone(), entry.clone());
            self.writer.submit(
                user_id,
                vec![WriteOp::UpsertProgress(ProgressRow::from_entry(project_id.clone(), &entry))],
            );
            entry
        };
        self.notify();
        Ok(entry)
    }

    /// Append an artifact link and return its index.
    ///
    /// Surrounding whitespace is trimmed; a blank URL is ignored and yields
    /// `None`.
    pub fn add_artifact(&self, project_id: &ProjectId, url: &str) -> Result<Option<usize>> {
        self.project(project_id)?;
        let url = url.trim();
        let index = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            if url.is_empty() {
                debug!(project = %project_id, "blank artifact url ignored");
                return Ok(None);
            }

            let artifact = Artifact::new(url, Utc::now());
            let row = ArtifactRow::from_artifact(project_id.clone(), &artifact);
            let entry = state.progress.entry(project_id.clone()).or_default();
            entry.artifacts.push(artifact);
            let index = entry.artifacts.len() - 1;

            self.writer.submit(user_id, vec![WriteOp::InsertArtifact(row)]);
            index
        };
        self.notify();
        Ok(Some(index))
    }

    /// Remove the artifact at `index`. Out-of-range indices are a no-op.
    ///
    /// The remote row is deleted by artifact id, so other artifacts with
    /// the same URL are left alone.
    pub fn remove_artifact(&self, project_id: &ProjectId, index: usize) -> Result<Option<Artifact>> {
        self.project(project_id)?;
        let removed = {
            let mut state = self.state.write();
            let user_id = state.user_id()?;
            let Some(entry) = state.progress.get_mut(project_id) else {
                return Ok(None);
            };
            if index >= entry.artifacts.len() {
                return Ok(None);
            }

            let removed = entry.artifacts.remove(index);
            state.removed_artifacts.insert(removed.id);
            self.writer.submit(
                user_id,
                vec![WriteOp::DeleteArtifact {
                    project_id: project_id.clone(),
                    id: removed.id,
                }],
            );
            removed
        };
        self.notify();
        Ok(Some(removed))
    }
}
