//! Keeps an engine bound to whoever the auth provider says is signed in.

use std::sync::Arc;

use buildboard_auth::AuthProvider;
use buildboard_core::User;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::ProgressEngine;

/// Background task forwarding identity changes to a [`ProgressEngine`].
///
/// The current identity is applied right away, so an engine created while a
/// session already exists loads that user. Loads run on their own tasks;
/// a sign-out arriving mid-load clears state at once and the late load is
/// discarded by the engine.
pub struct SessionBinding {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionBinding {
    /// Start forwarding identity changes from `auth` to `engine`.
    pub fn spawn(auth: Arc<dyn AuthProvider>, engine: Arc<ProgressEngine>) -> Self {
        let identity = auth.subscribe();
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(watch_identity(identity, engine, stopped));
        Self {
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Stop forwarding and wait for the task to exit. Loads already started
    /// run to completion.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn watch_identity(
    mut identity: watch::Receiver<Option<User>>,
    engine: Arc<ProgressEngine>,
    mut stopped: oneshot::Receiver<()>,
) {
    let current = identity.borrow_and_update().clone();
    apply(&engine, current);

    loop {
        tokio::select! {
            changed = identity.changed() => {
                if changed.is_err() {
                    debug!("auth provider gone, session binding exiting");
                    break;
                }
                let user = identity.borrow_and_update().clone();
                apply(&engine, user);
            }
            _ = &mut stopped => break,
        }
    }
}

fn apply(engine: &Arc<ProgressEngine>, user: Option<User>) {
    if let Some(ticket) = engine.bind(user) {
        let engine = engine.clone();
        tokio::spawn(async move { engine.load(ticket).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::test_support::catalog;
    use buildboard_auth::LocalAuth;
    use buildboard_core::{EntryStatus, ProjectId, ProjectStatus, UserId};
    use buildboard_storage::{MemoryStore, ProgressRow, ProgressStore};
    use std::time::Duration;

    fn engine(store: Arc<MemoryStore>) -> Arc<ProgressEngine> {
        Arc::new(ProgressEngine::new(
            Arc::new(catalog(3)),
            store,
            EngineConfig::default(),
        ))
    }

    async fn wait_until(engine: &ProgressEngine, done: impl Fn(&ProgressEngine) -> bool) {
        let mut changes = engine.subscribe_changes();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(engine) {
                if changes.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .expect("engine never reached the expected state");
    }

    async fn seed_completed(store: &MemoryStore, user: &UserId, project: &str) {
        store
            .upsert_progress(
                user,
                &ProgressRow {
                    project_id: ProjectId::from(project),
                    status: EntryStatus::Completed,
                    started_at: None,
                    completed_at: None,
                    notes: String::new(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sign_in_loads_and_sign_out_clears() {
        let auth = Arc::new(LocalAuth::new());
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let binding = SessionBinding::spawn(auth.clone(), engine.clone());

        let user = auth.sign_up("Ada", "ada@example.com", "secret1").await.unwrap();
        wait_until(&engine, |e| e.user().is_some() && !e.is_loading()).await;
        assert_eq!(engine.completed_count(), 0);

        auth.sign_out().await.unwrap();
        wait_until(&engine, |e| e.user().is_none()).await;
        seed_completed(&store, &user.id, "p1").await;

        auth.sign_in("ada@example.com", "secret1").await.unwrap();
        wait_until(&engine, |e| e.status(&ProjectId::from("p1")) == ProjectStatus::Completed).await;
        assert_eq!(engine.user().unwrap().id, user.id);
        assert!(!engine.is_loading());

        auth.sign_out().await.unwrap();
        wait_until(&engine, |e| e.user().is_none()).await;
        assert!(engine.progress().is_empty());
        assert_eq!(engine.status(&ProjectId::from("p1")), ProjectStatus::Unlocked);

        binding.shutdown().await;
    }

    #[tokio::test]
    async fn test_existing_session_is_loaded_on_spawn() {
        let auth = Arc::new(LocalAuth::new());
        let store = Arc::new(MemoryStore::new());
        let user = auth.sign_up("Ada", "ada@example.com", "secret1").await.unwrap();
        seed_completed(&store, &user.id, "p1").await;

        let engine = engine(store);
        let _binding = SessionBinding::spawn(auth, engine.clone());
        wait_until(&engine, |e| e.completed_count() == 1 && !e.is_loading()).await;
        assert_eq!(engine.status(&ProjectId::from("p2")), ProjectStatus::Unlocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_during_load_wins() {
        let auth = Arc::new(LocalAuth::new());
        let store = Arc::new(MemoryStore::new());
        let user = auth.sign_up("Ada", "ada@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        seed_completed(&store, &user.id, "p1").await;
        store.set_read_delay(&user.id, Duration::from_secs(3)).await;

        let engine = engine(store);
        let _binding = SessionBinding::spawn(auth.clone(), engine.clone());

        auth.sign_in("ada@example.com", "secret1").await.unwrap();
        wait_until(&engine, |e| e.is_loading()).await;
        auth.sign_out().await.unwrap();
        wait_until(&engine, |e| e.user().is_none()).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(engine.progress().is_empty());
        assert!(!engine.is_loading());
    }

    #[tokio::test]
    async fn test_shutdown_stops_forwarding() {
        let auth = Arc::new(LocalAuth::new());
        let engine = engine(Arc::new(MemoryStore::new()));
        let binding = SessionBinding::spawn(auth.clone(), engine.clone());
        binding.shutdown().await;

        auth.sign_up("Ada", "ada@example.com", "secret1").await.unwrap();
        tokio::task::yield_now().await;
        assert!(engine.user().is_none());
    }
}
