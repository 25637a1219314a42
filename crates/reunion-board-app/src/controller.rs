//! Single owner of the board snapshot.

use std::sync::Arc;

use anyhow::Result;
use reunion_board_core::event::{BoardChange, Table};
use reunion_board_core::projection::{self, BoardFilter, BoardProjection};
use reunion_board_core::{BoardSnapshot, BoardUpdate, FoldOutcome};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::loader::load_snapshot;
use crate::remote_store::RemoteStore;

/// Holds the snapshot and publishes every applied fold to render subscribers.
///
/// [`BoardController::fold`] is the only mutation entry point.
pub struct BoardController {
    state: watch::Sender<BoardSnapshot>,
}

impl BoardController {
    /// Wrap an already assembled snapshot.
    #[must_use]
    pub fn new(snapshot: BoardSnapshot) -> Self {
        let (state, _) = watch::channel(snapshot);
        Self { state }
    }

    /// Load the initial snapshot from `store`.
    ///
    /// # Errors
    /// Returns an error if any collection fails to load.
    pub async fn load<S: RemoteStore>(store: &S) -> Result<Self> {
        Ok(Self::new(load_snapshot(store).await?))
    }

    /// Clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.state.borrow().clone()
    }

    /// Run `f` against the current snapshot without cloning it.
    pub fn with_snapshot<T>(&self, f: impl FnOnce(&BoardSnapshot) -> T) -> T {
        f(&self.state.borrow())
    }

    /// Project the current snapshot and hand the projection to `f`.
    pub fn with_projection<T>(&self, filter: &BoardFilter, f: impl FnOnce(&BoardProjection<'_>) -> T) -> T {
        self.with_snapshot(|snapshot| f(&projection::project(snapshot, filter)))
    }

    /// Receiver notified after every applied fold.
    #[must_use]
    pub fn subscribe_renders(&self) -> watch::Receiver<BoardSnapshot> {
        self.state.subscribe()
    }

    /// Fold one update; subscribers are notified only when it applied.
    pub fn fold(&self, update: &BoardUpdate) -> FoldOutcome {
        let mut outcome = FoldOutcome::Ignored;
        self.state.send_if_modified(|snapshot| {
            outcome = snapshot.fold(update);
            outcome.is_applied()
        });
        if !outcome.is_applied() {
            debug!(?update, "Ignored board update");
        }
        outcome
    }

    /// Fold a change event.
    pub fn fold_change(&self, change: BoardChange) -> FoldOutcome {
        self.fold(&BoardUpdate::Change(change))
    }

    /// Spawn a task that folds every change of `tables` arriving on `receiver`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_listener(
        self: &Arc<Self>,
        mut receiver: broadcast::Receiver<BoardChange>,
        tables: &[Table],
    ) -> Subscription {
        let controller = Arc::clone(self);
        let tables = tables.to_vec();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        if tables.contains(&change.table()) {
                            controller.fold_change(change);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed lagged; snapshot may be stale");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Change feed closed");
                        break;
                    }
                }
            }
        });
        Subscription {
            handle: Some(handle),
        }
    }

    /// Subscribe to `store` and listen on every board table.
    pub fn listen<S: RemoteStore>(self: &Arc<Self>, store: &S) -> Subscription {
        self.spawn_listener(store.subscribe(), &Table::ALL)
    }
}

/// Handle of a running listener; dropping it unsubscribes.
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop listening.
    pub fn unsubscribe(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// True once the listener has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until the feed closes.
    pub async fn closed(mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
        {
            debug!(%err, "Listener ended abnormally");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
