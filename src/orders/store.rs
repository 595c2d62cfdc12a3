//! Durable store of orders waiting for resubmission.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::sync::Arc;

use crate::db::Database;
use crate::error::StorageError;

use super::{Order, PendingOrder};

/// A stored pending order, or why it could not be read back.
pub type PendingRow = Result<PendingOrder, StorageError>;

/// Key-value store of pending orders, keyed by order id.
#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Insert an order, replacing the payload of one with the same id.
  async fn put(&self, order: &Order) -> Result<(), StorageError>;

  /// Every pending order in arrival order.
  ///
  /// The outer error means the store could not be read at all; a single row
  /// that fails to decode comes back as an `Err` entry among the others.
  async fn pending(&self) -> Result<Vec<PendingRow>, StorageError>;

  /// Remove an acknowledged order. Returns whether it was present.
  async fn remove(&self, order_id: &str) -> Result<bool, StorageError>;
}

/// SQLite-backed order store.
pub struct SqliteOrderStore {
  db: Arc<Database>,
}

impl SqliteOrderStore {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
  async fn put(&self, order: &Order) -> Result<(), StorageError> {
    let conn = self.db.conn()?;
    let payload = serde_json::to_vec(order)?;

    // Re-queuing keeps the original position
    conn.execute(
      "INSERT INTO pending_orders (order_id, payload, queued_at) VALUES (?, ?, ?)
       ON CONFLICT(order_id) DO UPDATE SET payload = excluded.payload",
      params![order.id, payload, Utc::now().to_rfc3339()],
    )?;
    Ok(())
  }

  async fn pending(&self) -> Result<Vec<PendingRow>, StorageError> {
    let conn = self.db.conn()?;
    let mut stmt =
      conn.prepare("SELECT order_id, payload, queued_at FROM pending_orders ORDER BY seq")?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, Vec<u8>>(1)?,
          row.get::<_, String>(2)?,
        ))
      })?
      .collect::<Result<Vec<_>, _>>()?;

    Ok(
      rows
        .into_iter()
        .map(|(order_id, payload, queued_at)| decode_row(&order_id, &payload, &queued_at))
        .collect(),
    )
  }

  async fn remove(&self, order_id: &str) -> Result<bool, StorageError> {
    let conn = self.db.conn()?;
    let removed = conn.execute(
      "DELETE FROM pending_orders WHERE order_id = ?",
      params![order_id],
    )?;
    Ok(removed > 0)
  }
}

fn decode_row(order_id: &str, payload: &[u8], queued_at: &str) -> PendingRow {
  let corrupt = |e: &dyn std::fmt::Display| {
    StorageError::corrupt("pending_orders", format!("order {}: {}", order_id, e))
  };

  let order: Order = serde_json::from_slice(payload).map_err(|e| corrupt(&e))?;
  let queued_at = DateTime::parse_from_rfc3339(queued_at)
    .map_err(|e| corrupt(&e))?
    .with_timezone(&Utc);
  Ok(PendingOrder { order, queued_at })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn store() -> SqliteOrderStore {
    SqliteOrderStore::new(Arc::new(Database::open_in_memory().unwrap()))
  }

  async fn readable(store: &SqliteOrderStore) -> Vec<PendingOrder> {
    store
      .pending()
      .await
      .unwrap()
      .into_iter()
      .map(|row| row.unwrap())
      .collect()
  }

  #[tokio::test]
  async fn test_pending_preserves_arrival_order() {
    let store = store();
    store.put(&Order::new("b", json!({"total": 2}))).await.unwrap();
    store.put(&Order::new("a", json!({"total": 1}))).await.unwrap();

    let ids: Vec<String> = readable(&store)
      .await
      .into_iter()
      .map(|p| p.order.id)
      .collect();
    assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
  }

  #[tokio::test]
  async fn test_requeue_replaces_payload_in_place() {
    let store = store();
    store.put(&Order::new("a", json!({"qty": 1}))).await.unwrap();
    store.put(&Order::new("b", json!({"qty": 1}))).await.unwrap();
    store.put(&Order::new("a", json!({"qty": 5}))).await.unwrap();

    let pending = readable(&store).await;
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].order.id, "a");
    assert_eq!(pending[0].order.details["qty"], json!(5));
  }

  #[tokio::test]
  async fn test_remove() {
    let store = store();
    store.put(&Order::new("a", json!({}))).await.unwrap();

    assert!(store.remove("a").await.unwrap());
    assert!(!store.remove("a").await.unwrap());
    assert!(store.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_corrupt_row_does_not_hide_others() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let store = SqliteOrderStore::new(Arc::clone(&db));
    store.put(&Order::new("a", json!({}))).await.unwrap();
    db.conn()
      .unwrap()
      .execute(
        "INSERT INTO pending_orders (order_id, payload, queued_at) VALUES (?, ?, ?)",
        params!["broken", b"not json".to_vec(), Utc::now().to_rfc3339()],
      )
      .unwrap();
    store.put(&Order::new("c", json!({}))).await.unwrap();

    let rows = store.pending().await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].as_ref().unwrap().order.id, "a");
    assert!(matches!(
      &rows[1],
      Err(StorageError::Corrupt { message, .. }) if message.contains("broken")
    ));
    assert_eq!(rows[2].as_ref().unwrap().order.id, "c");
  }
}
