//! Tests for the order stores.
//!
//! Behavioural checks run against both implementations; SQLite-only tests
//! cover durability across reopen and the pool split.

use super::*;
use crate::codec::{self, tests::ORDERS_FIXTURE};
use crate::domain::{OrderStatus, OrderType};
use chrono::DateTime;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

fn order(id: &str, created_at: i64) -> Order {
    Order {
        order_id: id.to_string(),
        amount: Decimal::from_str("748.279727546401").unwrap(),
        currency: "BTC".to_string(),
        created_at: DateTime::from_timestamp(created_at, 0).unwrap(),
        status: OrderStatus::Cancelled,
        order_type: OrderType::Deposit,
    }
}

fn fixture_orders() -> Vec<Order> {
    codec::decode(ORDERS_FIXTURE.as_bytes()).unwrap()
}

async fn open_sqlite(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("orders.db");
    SqliteStore::new(SqliteStoreConfig {
        path: path.to_str().unwrap().to_string(),
        max_read_connections: 2,
    })
    .await
    .unwrap()
}

// ==================== Shared behaviour ====================

async fn check_empty_store(store: &dyn OrderStore) {
    assert!(!store.has_records().await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.get_all().await.unwrap().is_empty());
}

async fn check_bulk_insert_visible_on_return(store: &dyn OrderStore) {
    let orders = fixture_orders();

    let changes = store.bulk_insert(&orders).await.unwrap();

    assert_eq!(changes.len(), 59);
    assert_eq!(changes.generation, 1);
    assert!(store.has_records().await.unwrap());
    assert_eq!(store.count().await.unwrap(), 59);
}

async fn check_empty_bulk_insert_is_noop(store: &dyn OrderStore) {
    let changes = store.bulk_insert(&[]).await.unwrap();

    assert!(changes.is_empty());
    assert_eq!(changes.generation, 0);
    assert!(!store.has_records().await.unwrap());
    assert_eq!(*store.changes().borrow(), 0);
}

async fn check_unpublished_batch_invisible(store: &dyn OrderStore) {
    let changes = store.write_batch(&[order("a", 100)]).await.unwrap();

    assert!(!store.has_records().await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);

    store.propagate_to_read_context(&changes);

    assert!(store.has_records().await.unwrap());
    assert_eq!(store.count().await.unwrap(), 1);
}

async fn check_get_all_newest_first(store: &dyn OrderStore) {
    let orders = vec![order("b", 200), order("c", 300), order("a", 100), order("d", 200)];
    store.bulk_insert(&orders).await.unwrap();

    let ids: Vec<String> = store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.order_id)
        .collect();

    assert_eq!(ids, vec!["c", "b", "d", "a"]);
}

async fn check_round_trip_preserves_fields(store: &dyn OrderStore) {
    let orders = fixture_orders();
    store.bulk_insert(&orders).await.unwrap();

    let mut expected = orders.clone();
    expected.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });

    let stored = store.get_all().await.unwrap();
    assert_eq!(stored, expected);
}

async fn check_duplicate_only_batch_fails(store: &dyn OrderStore) {
    store.bulk_insert(&[order("a", 100)]).await.unwrap();

    let err = store.bulk_insert(&[order("a", 100)]).await.unwrap_err();

    assert!(matches!(err, StorageError::Persistence(_)));
    assert_eq!(store.count().await.unwrap(), 1);
}

async fn check_partial_duplicates_skipped(store: &dyn OrderStore) {
    store.bulk_insert(&[order("a", 100)]).await.unwrap();

    let changes = store
        .bulk_insert(&[order("a", 100), order("b", 200)])
        .await
        .unwrap();

    assert_eq!(changes.order_ids, vec!["b".to_string()]);
    assert_eq!(changes.generation, 2);
    assert_eq!(store.count().await.unwrap(), 2);
}

async fn check_propagate_never_moves_backwards(store: &dyn OrderStore) {
    let first = store.write_batch(&[order("a", 100)]).await.unwrap();
    let second = store.write_batch(&[order("b", 200)]).await.unwrap();

    store.propagate_to_read_context(&second);
    store.propagate_to_read_context(&first);

    assert_eq!(*store.changes().borrow(), second.generation);
    assert_eq!(store.count().await.unwrap(), 2);
}

async fn check_changes_notifies_subscribers(store: &dyn OrderStore) {
    let mut rx = store.changes();

    store.bulk_insert(&[order("a", 100)]).await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), 1);
}

#[tokio::test]
async fn test_memory_empty_store() {
    check_empty_store(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_bulk_insert_visible_on_return() {
    check_bulk_insert_visible_on_return(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_empty_bulk_insert_is_noop() {
    check_empty_bulk_insert_is_noop(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_unpublished_batch_invisible() {
    check_unpublished_batch_invisible(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_get_all_newest_first() {
    check_get_all_newest_first(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_round_trip_preserves_fields() {
    check_round_trip_preserves_fields(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_duplicate_only_batch_fails() {
    check_duplicate_only_batch_fails(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_partial_duplicates_skipped() {
    check_partial_duplicates_skipped(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_propagate_never_moves_backwards() {
    check_propagate_never_moves_backwards(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_changes_notifies_subscribers() {
    check_changes_notifies_subscribers(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_empty_store() {
    let dir = TempDir::new().unwrap();
    check_empty_store(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_bulk_insert_visible_on_return() {
    let dir = TempDir::new().unwrap();
    check_bulk_insert_visible_on_return(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_empty_bulk_insert_is_noop() {
    let dir = TempDir::new().unwrap();
    check_empty_bulk_insert_is_noop(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_unpublished_batch_invisible() {
    let dir = TempDir::new().unwrap();
    check_unpublished_batch_invisible(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_get_all_newest_first() {
    let dir = TempDir::new().unwrap();
    check_get_all_newest_first(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_round_trip_preserves_fields() {
    let dir = TempDir::new().unwrap();
    check_round_trip_preserves_fields(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_duplicate_only_batch_fails() {
    let dir = TempDir::new().unwrap();
    check_duplicate_only_batch_fails(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_partial_duplicates_skipped() {
    let dir = TempDir::new().unwrap();
    check_partial_duplicates_skipped(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_propagate_never_moves_backwards() {
    let dir = TempDir::new().unwrap();
    check_propagate_never_moves_backwards(&open_sqlite(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_changes_notifies_subscribers() {
    let dir = TempDir::new().unwrap();
    check_changes_notifies_subscribers(&open_sqlite(&dir).await).await;
}

// ==================== SQLite specifics ====================

#[tokio::test]
async fn test_sqlite_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let store = open_sqlite(&dir).await;
    store.bulk_insert(&fixture_orders()).await.unwrap();
    store.close().await.unwrap();

    let reopened = open_sqlite(&dir).await;
    assert!(reopened.has_records().await.unwrap());
    assert_eq!(reopened.count().await.unwrap(), 59);
    assert_eq!(*reopened.changes().borrow(), 1);
}

#[tokio::test]
async fn test_sqlite_committed_but_unpublished_visible_after_reopen() {
    let dir = TempDir::new().unwrap();

    let store = open_sqlite(&dir).await;
    store.write_batch(&[order("a", 100)]).await.unwrap();
    assert!(!store.has_records().await.unwrap());
    store.close().await.unwrap();

    let reopened = open_sqlite(&dir).await;
    assert!(reopened.has_records().await.unwrap());
}

#[tokio::test]
async fn test_sqlite_large_batch_spans_statements() {
    let dir = TempDir::new().unwrap();
    let store = open_sqlite(&dir).await;

    let orders: Vec<Order> = (0..1200)
        .map(|i| order(&format!("order-{:04}", i), 1_600_000_000 + i))
        .collect();

    let changes = store.bulk_insert(&orders).await.unwrap();

    assert_eq!(changes.len(), 1200);
    assert_eq!(store.count().await.unwrap(), 1200);
}

#[tokio::test]
async fn test_sqlite_preserves_amount_scale() {
    let dir = TempDir::new().unwrap();
    let store = open_sqlite(&dir).await;

    let mut o = order("a", 100);
    o.amount = Decimal::from_str("0.10000000").unwrap();
    store.bulk_insert(&[o]).await.unwrap();

    let stored = store.get_all().await.unwrap();
    assert_eq!(stored[0].amount.to_string(), "0.10000000");
}

#[tokio::test]
async fn test_sqlite_closed_store_fails_query() {
    let dir = TempDir::new().unwrap();
    let store = open_sqlite(&dir).await;
    store.close().await.unwrap();

    let err = store.has_records().await.unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));
}

#[tokio::test]
async fn test_sqlite_open_fails_on_directory_path() {
    let dir = TempDir::new().unwrap();

    let result = SqliteStore::new(SqliteStoreConfig {
        path: dir.path().to_str().unwrap().to_string(),
        max_read_connections: 1,
    })
    .await;

    assert!(matches!(result, Err(StorageError::Database(_))));
}
