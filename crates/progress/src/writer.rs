//! Background writer: applies persistence writes in submission order.
//!
//! Mutations apply locally first and hand their writes to this queue. A
//! single worker task drains it, retrying each write with exponential
//! backoff and reporting writes that never succeed.

use std::sync::Arc;

use buildboard_core::{ArtifactId, ProjectId, UserId};
use buildboard_storage::{ActivityRow, ArtifactRow, ProgressRow, ProgressStore, Table};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::SyncError;

/// One row-level write.
#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    UpsertProgress(ProgressRow),
    InsertArtifact(ArtifactRow),
    DeleteArtifact { project_id: ProjectId, id: ArtifactId },
    InsertActivity(ActivityRow),
}

impl WriteOp {
    fn table(&self) -> Table {
        match self {
            WriteOp::UpsertProgress(_) => Table::Progress,
            WriteOp::InsertArtifact(_) | WriteOp::DeleteArtifact { .. } => Table::Artifacts,
            WriteOp::InsertActivity(_) => Table::Activity,
        }
    }

    fn project_id(&self) -> &ProjectId {
        match self {
            WriteOp::UpsertProgress(row) => &row.project_id,
            WriteOp::InsertArtifact(row) => &row.project_id,
            WriteOp::DeleteArtifact { project_id, .. } => project_id,
            WriteOp::InsertActivity(row) => &row.project_id,
        }
    }

    async fn apply(&self, store: &dyn ProgressStore, user: &UserId) -> buildboard_storage::Result<()> {
        match self {
            WriteOp::UpsertProgress(row) => store.upsert_progress(user, row).await,
            WriteOp::InsertArtifact(row) => store.insert_artifact(user, row).await,
            WriteOp::DeleteArtifact { project_id, id } => store.delete_artifact(user, project_id, *id).await,
            WriteOp::InsertActivity(row) => store.insert_activity(user, row).await,
        }
    }
}

enum Command {
    Write { user: UserId, ops: Vec<WriteOp> },
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. Dropping it lets the worker drain and exit.
pub(crate) struct WriteQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl WriteQueue {
    /// Spawn the worker on the current Tokio runtime.
    pub(crate) fn spawn(
        store: Arc<dyn ProgressStore>,
        config: EngineConfig,
        errors: broadcast::Sender<SyncError>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, config, errors, rx));
        Self { tx }
    }

    /// Queue writes for `user`. They run after everything queued before.
    pub(crate) fn submit(&self, user: UserId, ops: Vec<WriteOp>) {
        if self.tx.send(Command::Write { user, ops }).is_err() {
            warn!("writer stopped, dropping writes");
        }
    }

    /// Wait until everything queued so far has been attempted.
    pub(crate) async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run(
    store: Arc<dyn ProgressStore>,
    config: EngineConfig,
    errors: broadcast::Sender<SyncError>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write { user, ops } => {
                for op in ops {
                    write_with_retry(store.as_ref(), &config, &errors, &user, &op).await;
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("writer exiting");
}

async fn write_with_retry(
    store: &dyn ProgressStore,
    config: &EngineConfig,
    errors: &broadcast::Sender<SyncError>,
    user: &UserId,
    op: &WriteOp,
) {
    let attempts = config.attempts();
    let mut retry = 0;
    loop {
        match op.apply(store, user).await {
            Ok(()) => return,
            Err(e) if retry + 1 < attempts => {
                debug!(table = %op.table(), project = %op.project_id(), error = %e, retry, "write failed, retrying");
                tokio::time::sleep(config.backoff(retry)).await;
                retry += 1;
            }
            Err(e) => {
                warn!(table = %op.table(), project = %op.project_id(), error = %e, attempts, "write failed, giving up");
                // no subscribers is fine
                let _ = errors.send(SyncError::Write {
                    table: op.table(),
                    project_id: op.project_id().clone(),
                    attempts,
                    message: e.to_string(),
                });
                return;
            }
        }
    }
}
