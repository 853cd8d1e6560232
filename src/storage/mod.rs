//! Durable order cache.
//!
//! Every store has two sides. The write context commits batches in a single
//! transaction and stamps each batch with a new generation. The read context
//! only observes generations that were explicitly published through
//! [`OrderStore::propagate_to_read_context`], so a reader either sees a whole
//! batch or none of it.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SqliteStoreConfig};

use crate::domain::Order;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

/// Monotonic batch number. Zero means nothing has been written.
pub type Generation = i64;

/// ChangeSet describes one committed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Generation stamped on every row of the batch.
    pub generation: Generation,
    /// Ids of the rows that were actually inserted.
    pub order_ids: Vec<String>,
}

impl ChangeSet {
    /// Returns true if the batch inserted nothing.
    pub fn is_empty(&self) -> bool {
        self.order_ids.is_empty()
    }

    /// Number of inserted rows.
    pub fn len(&self) -> usize {
        self.order_ids.len()
    }
}

/// OrderStore defines the interface of the order cache.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns true if the read context observes at least one order.
    async fn has_records(&self) -> Result<bool, StorageError>;

    /// Commits the orders in one transaction on the write context.
    ///
    /// The returned change set is not visible to readers until it is propagated.
    /// Fails with `StorageError::Persistence` if nothing was inserted.
    async fn write_batch(&self, orders: &[Order]) -> Result<ChangeSet, StorageError>;

    /// Makes a committed change set visible to the read context.
    /// Publishing an older generation than the current one is a no-op.
    fn propagate_to_read_context(&self, changes: &ChangeSet);

    /// Returns all visible orders, newest first.
    async fn get_all(&self) -> Result<Vec<Order>, StorageError>;

    /// Returns the number of visible orders.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Subscribes to the published generation.
    fn changes(&self) -> watch::Receiver<Generation>;

    /// Close releases the underlying medium.
    async fn close(&self) -> Result<(), StorageError>;

    /// Writes a batch and publishes it before returning.
    ///
    /// An empty batch is a no-op that does not touch storage.
    async fn bulk_insert(&self, orders: &[Order]) -> Result<ChangeSet, StorageError> {
        if orders.is_empty() {
            debug!("empty batch, nothing to insert");
            return Ok(ChangeSet::default());
        }

        let changes = self.write_batch(orders).await?;
        self.propagate_to_read_context(&changes);
        Ok(changes)
    }
}

/// Publishes `generation` on the channel unless a newer one is already visible.
pub(crate) fn publish(sender: &watch::Sender<Generation>, generation: Generation) -> bool {
    sender.send_if_modified(|current| {
        if generation > *current {
            *current = generation;
            true
        } else {
            false
        }
    })
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The medium could not be opened or queried.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A batch write failed or inserted nothing.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A stored row could not be mapped back to an order.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests;
