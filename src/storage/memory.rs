//! In-process implementation of OrderStore.
//!
//! Nothing survives the process. Used for throwaway runs and as the store
//! double in tests; it follows the same commit-then-publish rules as SQLite.

use crate::domain::Order;
use crate::storage::{ChangeSet, Generation, OrderStore, StorageError, publish};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::{RwLock, watch};
use tracing::debug;

struct StoredOrder {
    generation: Generation,
    order: Order,
}

#[derive(Default)]
struct Table {
    rows: Vec<StoredOrder>,
    ids: HashSet<String>,
    last_generation: Generation,
}

/// MemoryStore keeps orders in a vector guarded by an async lock.
pub struct MemoryStore {
    table: RwLock<Table>,
    published: watch::Sender<Generation>,
}

impl MemoryStore {
    /// Creates an empty store with nothing published.
    pub fn new() -> Self {
        let (published, _) = watch::channel(0);
        Self {
            table: RwLock::new(Table::default()),
            published,
        }
    }

    fn visible_generation(&self) -> Generation {
        *self.published.borrow()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn has_records(&self) -> Result<bool, StorageError> {
        let visible = self.visible_generation();
        let table = self.table.read().await;
        Ok(table.rows.iter().any(|r| r.generation <= visible))
    }

    async fn write_batch(&self, orders: &[Order]) -> Result<ChangeSet, StorageError> {
        let mut table = self.table.write().await;
        let generation = table.last_generation + 1;

        // Stage first so a rejected batch leaves the table untouched.
        let mut staged_ids = HashSet::new();
        let mut order_ids = Vec::new();
        for order in orders {
            if table.ids.contains(&order.order_id) || !staged_ids.insert(order.order_id.clone()) {
                continue;
            }
            order_ids.push(order.order_id.clone());
        }

        if order_ids.is_empty() {
            return Err(StorageError::Persistence(format!(
                "batch of {} orders inserted no rows",
                orders.len()
            )));
        }

        for order in orders.iter().filter(|o| staged_ids.contains(&o.order_id)) {
            if table.ids.insert(order.order_id.clone()) {
                table.rows.push(StoredOrder {
                    generation,
                    order: order.clone(),
                });
            }
        }
        table.last_generation = generation;

        debug!(generation, inserted = order_ids.len(), "batch committed");

        Ok(ChangeSet {
            generation,
            order_ids,
        })
    }

    fn propagate_to_read_context(&self, changes: &ChangeSet) {
        publish(&self.published, changes.generation);
    }

    async fn get_all(&self) -> Result<Vec<Order>, StorageError> {
        let visible = self.visible_generation();
        let table = self.table.read().await;

        let mut orders: Vec<Order> = table
            .rows
            .iter()
            .filter(|r| r.generation <= visible)
            .map(|r| r.order.clone())
            .collect();

        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });

        Ok(orders)
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let visible = self.visible_generation();
        let table = self.table.read().await;
        Ok(table.rows.iter().filter(|r| r.generation <= visible).count() as i64)
    }

    fn changes(&self) -> watch::Receiver<Generation> {
        self.published.subscribe()
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
