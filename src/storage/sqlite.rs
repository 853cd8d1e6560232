//! SQLite implementation of OrderStore.
//!
//! The database runs in WAL mode so the read pool never blocks on the writer.
//! All writes go through a single-connection pool; reads use a separate
//! read-only pool and are bounded by the last published generation.

use crate::config::StorageConfig;
use crate::domain::{Order, OrderStatus, OrderType};
use crate::storage::{ChangeSet, Generation, OrderStore, StorageError, publish};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Rows per INSERT statement; 7 bound parameters each keeps well under SQLite's variable limit.
const ROWS_PER_STATEMENT: usize = 500;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SqliteStore implements OrderStore using SQLite.
pub struct SqliteStore {
    writer: Pool<Sqlite>,
    reader: Pool<Sqlite>,
    published: watch::Sender<Generation>,
}

/// SqliteStoreConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the read pool.
    pub max_read_connections: u32,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        StorageConfig::default().into()
    }
}

impl From<StorageConfig> for SqliteStoreConfig {
    fn from(config: StorageConfig) -> Self {
        Self {
            path: config.path,
            max_read_connections: config.max_read_connections,
        }
    }
}

impl SqliteStore {
    /// Opens (or creates) the database and publishes everything already committed.
    pub async fn new(config: SqliteStoreConfig) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}", config.path);

        let write_options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_options)
            .await?;

        migrate(&writer).await?;

        let read_options = SqliteConnectOptions::from_str(&url)?
            .read_only(true)
            .busy_timeout(BUSY_TIMEOUT);

        let reader = SqlitePoolOptions::new()
            .max_connections(config.max_read_connections.max(1))
            .connect_with(read_options)
            .await?;

        let committed: Generation =
            sqlx::query("SELECT COALESCE(MAX(generation), 0) AS generation FROM orders")
                .fetch_one(&writer)
                .await?
                .try_get("generation")?;

        let (published, _) = watch::channel(committed);

        info!(path = %config.path, generation = committed, "SQLite storage initialized");

        Ok(Self {
            writer,
            reader,
            published,
        })
    }

    fn visible_generation(&self) -> Generation {
        *self.published.borrow()
    }
}

/// Runs database migrations to create the schema.
async fn migrate(pool: &Pool<Sqlite>) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            status TEXT NOT NULL,
            order_type TEXT NOT NULL,
            generation INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_generation ON orders(generation)")
        .execute(pool)
        .await?;

    Ok(())
}

fn persistence(err: sqlx::Error) -> StorageError {
    StorageError::Persistence(err.to_string())
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn has_records(&self) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE generation <= ?1) AS present",
        )
        .bind(self.visible_generation())
        .fetch_one(&self.reader)
        .await?;

        let present: i64 = row.try_get("present")?;
        Ok(present != 0)
    }

    async fn write_batch(&self, orders: &[Order]) -> Result<ChangeSet, StorageError> {
        let mut tx = self.writer.begin().await.map_err(persistence)?;

        let last: Generation =
            sqlx::query("SELECT COALESCE(MAX(generation), 0) AS generation FROM orders")
                .fetch_one(&mut *tx)
                .await
                .and_then(|row| row.try_get("generation"))
                .map_err(persistence)?;
        let generation = last + 1;

        let mut order_ids = Vec::with_capacity(orders.len());

        for chunk in orders.chunks(ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO orders (order_id, amount, currency, created_at, status, order_type, generation) ",
            );

            builder.push_values(chunk, |mut row, order| {
                row.push_bind(order.order_id.clone())
                    .push_bind(order.amount.to_string())
                    .push_bind(order.currency.clone())
                    .push_bind(order.created_at.timestamp())
                    .push_bind(order.status.as_str())
                    .push_bind(order.order_type.as_str())
                    .push_bind(generation);
            });
            builder.push(" ON CONFLICT(order_id) DO NOTHING RETURNING order_id");

            let rows = builder
                .build()
                .fetch_all(&mut *tx)
                .await
                .map_err(persistence)?;

            for row in rows {
                order_ids.push(row.try_get::<String, _>("order_id").map_err(persistence)?);
            }
        }

        if order_ids.is_empty() {
            tx.rollback().await.map_err(persistence)?;
            warn!(requested = orders.len(), "batch inserted no rows");
            return Err(StorageError::Persistence(format!(
                "batch of {} orders inserted no rows",
                orders.len()
            )));
        }

        tx.commit().await.map_err(persistence)?;

        debug!(
            generation,
            requested = orders.len(),
            inserted = order_ids.len(),
            "batch committed"
        );

        Ok(ChangeSet {
            generation,
            order_ids,
        })
    }

    fn propagate_to_read_context(&self, changes: &ChangeSet) {
        if publish(&self.published, changes.generation) {
            debug!(
                generation = changes.generation,
                orders = changes.len(),
                "changes published to read context"
            );
        }
    }

    async fn get_all(&self) -> Result<Vec<Order>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, amount, currency, created_at, status, order_type
            FROM orders WHERE generation <= ?1
            ORDER BY created_at DESC, order_id ASC
            "#,
        )
        .bind(self.visible_generation())
        .fetch_all(&self.reader)
        .await?;

        rows.iter().map(parse_order_row).collect()
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM orders WHERE generation <= ?1")
            .bind(self.visible_generation())
            .fetch_one(&self.reader)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn changes(&self) -> watch::Receiver<Generation> {
        self.published.subscribe()
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.reader.close().await;
        self.writer.close().await;
        Ok(())
    }
}

/// Parses an order from a database row.
fn parse_order_row(row: &SqliteRow) -> Result<Order, StorageError> {
    let order_id: String = row.try_get("order_id")?;

    let amount_str: String = row.try_get("amount")?;
    let amount = Decimal::from_str(&amount_str)
        .map_err(|e| StorageError::InvalidData(format!("order {}: invalid amount: {}", order_id, e)))?;

    let created_at_secs: i64 = row.try_get("created_at")?;
    let created_at = DateTime::from_timestamp(created_at_secs, 0).ok_or_else(|| {
        StorageError::InvalidData(format!(
            "order {}: invalid created_at: {}",
            order_id, created_at_secs
        ))
    })?;

    let status_str: String = row.try_get("status")?;
    let status = OrderStatus::from_str(&status_str)
        .map_err(|e| StorageError::InvalidData(format!("order {}: {}", order_id, e)))?;

    let type_str: String = row.try_get("order_type")?;
    let order_type = OrderType::from_str(&type_str)
        .map_err(|e| StorageError::InvalidData(format!("order {}: {}", order_id, e)))?;

    Ok(Order {
        order_id,
        amount,
        currency: row.try_get("currency")?,
        created_at,
        status,
        order_type,
    })
}
