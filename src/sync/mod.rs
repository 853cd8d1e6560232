//! Fetch-once synchronization of remote orders into the local cache.
//!
//! The coordinator fetches only when the store is empty. Once a store is
//! populated, every later call short-circuits without touching the network.

mod error;
mod state;

pub use error::{ErrorKind, SyncError, SyncStage};
pub use state::SyncState;

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tracing::{debug, info, warn};

use crate::codec;
use crate::domain::Order;
use crate::remote::RemoteClient;
use crate::storage::{OrderStore, StorageError};

/// Result of a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The store already held orders; nothing was fetched.
    AlreadyCached,
    /// Orders were fetched and persisted.
    Fetched { inserted: usize },
}

/// SyncCoordinator composes a remote source and a store.
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteClient>,
    store: Arc<dyn OrderStore>,
    state: Arc<watch::Sender<SyncState>>,
    // Serializes sync calls so at most one fetch is in flight. A started
    // write holds it until the batch is committed and published.
    in_flight: Arc<Mutex<()>>,
}

impl SyncCoordinator {
    /// Creates a coordinator in the `Initial` state.
    pub fn new(remote: Arc<dyn RemoteClient>, store: Arc<dyn OrderStore>) -> Self {
        let (state, _) = watch::channel(SyncState::Initial);
        Self {
            remote,
            store,
            state: Arc::new(state),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Fetches and caches orders unless the store already holds some.
    ///
    /// The batch write runs on its own task: once it has started, dropping
    /// this future does not abort it. The task keeps the sync lock and sets
    /// the final state itself, so a following `sync()` waits for the commit
    /// and then short-circuits.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let guard = Arc::clone(&self.in_flight).lock_owned().await;

        self.state.send_replace(SyncState::Loading);
        let mut reset = ResetOnCancel {
            state: &self.state,
            armed: true,
        };

        let result = match self.prepare().await {
            Ok(None) => Ok(SyncOutcome::AlreadyCached),
            Ok(Some(orders)) => {
                reset.armed = false;
                self.persist(orders, guard).await
            }
            Err(e) => Err(e),
        };

        // Once the write was handed off, the task owns the final state; a
        // queued sync may already be running.
        let owns_state = reset.armed;
        match &result {
            Ok(outcome) => {
                if owns_state {
                    self.state.send_replace(SyncState::Loaded);
                }
                debug!(?outcome, "sync finished");
            }
            Err(e) => {
                warn!(stage = %e.stage(), error = %e, "sync failed");
                if owns_state {
                    self.state.send_replace(SyncState::Failed(e.to_string()));
                }
            }
        }

        result
    }

    /// Checks the store and, when it is empty, fetches and decodes a batch.
    async fn prepare(&self) -> Result<Option<Vec<Order>>, SyncError> {
        if self.store.has_records().await.map_err(SyncError::Check)? {
            debug!("orders already cached, skipping fetch");
            return Ok(None);
        }

        info!("no cached orders, fetching from remote");

        let payload = self.remote.fetch().await.map_err(SyncError::Fetch)?;
        let orders = codec::decode(&payload).map_err(SyncError::Decode)?;

        info!(count = orders.len(), bytes = payload.len(), "orders decoded");

        Ok(Some(orders))
    }

    /// Runs the bulk insert on the background write context and waits for it.
    ///
    /// The spawned task owns the sync lock and releases it only after the
    /// batch is visible to readers.
    async fn persist(
        &self,
        orders: Vec<Order>,
        guard: OwnedMutexGuard<()>,
    ) -> Result<SyncOutcome, SyncError> {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            let result = store.bulk_insert(&orders).await.map_err(SyncError::Persist);
            match &result {
                Ok(changes) => {
                    info!(inserted = changes.len(), "orders cached");
                    state.send_replace(SyncState::Loaded);
                }
                Err(e) => {
                    state.send_replace(SyncState::Failed(e.to_string()));
                }
            }
            drop(guard);
            result
        });

        let changes = handle.await.map_err(|e| {
            let err =
                SyncError::Persist(StorageError::Persistence(format!("write task failed: {}", e)));
            self.state.send_replace(SyncState::Failed(err.to_string()));
            err
        })??;

        Ok(SyncOutcome::Fetched {
            inserted: changes.len(),
        })
    }

    /// Alias of [`sync`](Self::sync) for read-side collaborators.
    pub async fn fetch_orders(&self) -> Result<SyncOutcome, SyncError> {
        self.sync().await
    }

    /// Returns true if the read context observes cached orders.
    pub async fn has_cached_orders(&self) -> Result<bool, StorageError> {
        self.store.has_records().await
    }

    /// Returns all cached orders, newest first.
    pub async fn cached_orders(&self) -> Result<Vec<Order>, StorageError> {
        self.store.get_all().await
    }

    /// Returns the current loading state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Subscribes to loading state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }
}

/// Puts the state back to `Initial` if a sync is dropped while loading and
/// before its write was handed to the background task.
struct ResetOnCancel<'a> {
    state: &'a watch::Sender<SyncState>,
    armed: bool,
}

impl Drop for ResetOnCancel<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = SyncState::Initial;
                true
            } else {
                false
            }
        });
    }
}
