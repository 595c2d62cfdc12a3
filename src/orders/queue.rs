//! Deferred operation queue: submit, enqueue and drain pending orders.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{StorageError, SubmitError};
use crate::net::{Fetch, Request};
use crate::report::{ErrorReporter, Failure, FailureKind};

use super::store::{OrderStore, PendingRow};
use super::{Order, PendingOrder};

/// Outcome of submitting an order while possibly offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
  /// The endpoint acknowledged the order
  Delivered,
  /// Submission failed; the order is queued for the next sync
  Deferred,
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
  /// Orders acknowledged and removed from the queue
  pub synced: Vec<String>,
  /// Orders still queued after this pass
  pub pending: Vec<String>,
  /// The pending store could not be read; nothing was attempted
  pub aborted: bool,
}

impl DrainReport {
  pub fn is_idle(&self) -> bool {
    self.synced.is_empty() && self.pending.is_empty() && !self.aborted
  }
}

/// Owns the pending orders and their redelivery.
///
/// No lock is held across a drain, so overlapping drains may submit the same
/// order twice; the endpoint is expected to treat order ids idempotently.
pub struct DeferredQueue<O: OrderStore, F: Fetch> {
  store: Arc<O>,
  network: Arc<F>,
  endpoint: Url,
  reporter: Arc<dyn ErrorReporter>,
}

impl<O: OrderStore, F: Fetch> DeferredQueue<O, F> {
  pub fn new(
    store: Arc<O>,
    network: Arc<F>,
    endpoint: Url,
    reporter: Arc<dyn ErrorReporter>,
  ) -> Self {
    Self {
      store,
      network,
      endpoint,
      reporter,
    }
  }

  /// Queue an order for the next sync.
  pub async fn enqueue(&self, order: &Order) -> Result<(), StorageError> {
    self.store.put(order).await?;
    info!(order_id = %order.id, "Queued order for background sync");
    Ok(())
  }

  /// Try to deliver an order now, queueing it if that fails.
  pub async fn submit(&self, order: &Order) -> Result<Submission, StorageError> {
    match self.send(order).await {
      Ok(()) => {
        info!(order_id = %order.id, "Order submitted");
        Ok(Submission::Delivered)
      }
      Err(e) => {
        debug!(order_id = %order.id, error = %e, "Submission failed, deferring");
        self.enqueue(order).await?;
        Ok(Submission::Deferred)
      }
    }
  }

  /// Orders currently waiting for delivery.
  ///
  /// Rows that no longer decode are reported and left out.
  pub async fn pending(&self) -> Result<Vec<PendingOrder>, StorageError> {
    let rows = self.store.pending().await?;
    Ok(self.readable(rows))
  }

  fn readable(&self, rows: Vec<PendingRow>) -> Vec<PendingOrder> {
    rows
      .into_iter()
      .filter_map(|row| match row {
        Ok(pending) => Some(pending),
        Err(e) => {
          self.reporter.report(Failure::new(
            FailureKind::StorageSoft,
            "reading pending order",
            &e,
          ));
          None
        }
      })
      .collect()
  }

  /// Attempt redelivery of every pending order.
  ///
  /// Each order is tried once, in arrival order. A failed order stays queued
  /// and does not stop the rest of the pass; a stored order that no longer
  /// decodes is reported and skipped. Never fails; problems are reported and
  /// reflected in the returned summary.
  pub async fn drain(&self) -> DrainReport {
    let mut report = DrainReport::default();

    let pending = match self.store.pending().await {
      Ok(rows) => self.readable(rows),
      Err(e) => {
        self.reporter.report(Failure::new(
          FailureKind::SyncPassFatal,
          "reading pending orders",
          &e,
        ));
        report.aborted = true;
        return report;
      }
    };

    for pending in pending {
      let order = pending.order;

      if let Err(e) = self.send(&order).await {
        self.reporter.report(Failure::new(
          FailureKind::SyncRetryable,
          format!("syncing order {}", order.id),
          &e,
        ));
        report.pending.push(order.id);
        continue;
      }

      info!(order_id = %order.id, "Order synced successfully");
      match self.store.remove(&order.id).await {
        Ok(_) => {
          debug!(order_id = %order.id, "Removed synced order");
          report.synced.push(order.id);
        }
        Err(e) => {
          // Delivered but still queued; the next pass resubmits it
          self.reporter.report(Failure::new(
            FailureKind::StorageSoft,
            format!("removing synced order {}", order.id),
            &e,
          ));
          report.pending.push(order.id);
        }
      }
    }

    report
  }

  async fn send(&self, order: &Order) -> Result<(), SubmitError> {
    let body = serde_json::to_vec(order)?;
    let request = Request::post_json(self.endpoint.clone(), body);

    let response = self.network.fetch(&request).await?;
    if response.is_ok() {
      Ok(())
    } else {
      Err(SubmitError::Rejected(response.status))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use crate::orders::SqliteOrderStore;
  use crate::config::NetworkConfig;
  use crate::net::HttpClient;
  use crate::test_support::{silent_server, FailingOrderStore, RecordingReporter, ScriptedNetwork};
  use serde_json::json;
  use std::time::Duration;

  fn endpoint() -> Url {
    Url::parse("https://shop.test/api/orders").unwrap()
  }

  fn queue(
    network: Arc<ScriptedNetwork>,
    reporter: Arc<RecordingReporter>,
  ) -> DeferredQueue<SqliteOrderStore, ScriptedNetwork> {
    let store = SqliteOrderStore::new(Arc::new(Database::open_in_memory().unwrap()));
    DeferredQueue::new(Arc::new(store), network, endpoint(), reporter)
  }

  #[tokio::test]
  async fn test_failed_order_stays_then_syncs() {
    let network = Arc::new(ScriptedNetwork::new());
    let reporter = Arc::new(RecordingReporter::default());
    let queue = queue(network.clone(), reporter.clone());
    let order = Order::new("o-1", json!({"total": 10}));

    queue.enqueue(&order).await.unwrap();

    // Endpoint unreachable
    let first = queue.drain().await;
    assert_eq!(first.pending, vec!["o-1".to_string()]);
    assert!(first.synced.is_empty());
    assert_eq!(queue.pending().await.unwrap().len(), 1);
    assert_eq!(reporter.kinds(), vec![FailureKind::SyncRetryable]);

    network.respond(&endpoint(), 201, b"");
    let second = queue.drain().await;
    assert_eq!(second.synced, vec!["o-1".to_string()]);
    assert!(queue.pending().await.unwrap().is_empty());

    let calls = network.calls();
    let third = queue.drain().await;
    assert!(third.is_idle());
    assert_eq!(network.calls(), calls);
  }

  #[tokio::test]
  async fn test_rejected_status_keeps_order() {
    let network = Arc::new(ScriptedNetwork::new());
    network.respond(&endpoint(), 503, b"busy");
    let queue = queue(network, Arc::new(RecordingReporter::default()));

    queue.enqueue(&Order::new("o-1", json!({}))).await.unwrap();
    let report = queue.drain().await;

    assert_eq!(report.pending, vec!["o-1".to_string()]);
    assert_eq!(queue.pending().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_one_bad_order_does_not_block_others() {
    let network = Arc::new(ScriptedNetwork::new());
    network.respond(&endpoint(), 200, b"");
    network.reject_body_containing("\"poison\"", 400);
    let queue = queue(network, Arc::new(RecordingReporter::default()));

    queue.enqueue(&Order::new("a", json!({}))).await.unwrap();
    queue
      .enqueue(&Order::new("bad", json!({"kind": "poison"})))
      .await
      .unwrap();
    queue.enqueue(&Order::new("c", json!({}))).await.unwrap();

    let report = queue.drain().await;
    assert_eq!(report.synced, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(report.pending, vec!["bad".to_string()]);
  }

  #[tokio::test]
  async fn test_submit_defers_when_offline() {
    let network = Arc::new(ScriptedNetwork::new());
    let queue = queue(network.clone(), Arc::new(RecordingReporter::default()));
    let order = Order::new("o-9", json!({"total": 3}));

    assert_eq!(queue.submit(&order).await.unwrap(), Submission::Deferred);
    assert_eq!(queue.pending().await.unwrap()[0].order, order);

    network.respond(&endpoint(), 200, b"");
    let other = Order::new("o-10", json!({}));
    assert_eq!(queue.submit(&other).await.unwrap(), Submission::Delivered);
    assert_eq!(queue.pending().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_submission_posts_json_order() {
    let network = Arc::new(ScriptedNetwork::new());
    network.respond(&endpoint(), 200, b"");
    let queue = queue(network.clone(), Arc::new(RecordingReporter::default()));

    queue
      .submit(&Order::new("o-1", json!({"total": 4})))
      .await
      .unwrap();

    let sent = network.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, reqwest::Method::POST);
    let body: serde_json::Value = serde_json::from_slice(sent[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({"id": "o-1", "total": 4}));
  }

  #[tokio::test]
  async fn test_unreadable_store_aborts_pass() {
    let network = Arc::new(ScriptedNetwork::new());
    let reporter = Arc::new(RecordingReporter::default());
    let queue = DeferredQueue::new(
      Arc::new(FailingOrderStore),
      network.clone(),
      endpoint(),
      reporter.clone(),
    );

    let report = queue.drain().await;
    assert!(report.aborted);
    assert_eq!(network.calls(), 0);
    assert_eq!(reporter.kinds(), vec![FailureKind::SyncPassFatal]);
  }

  #[tokio::test]
  async fn test_corrupt_order_is_skipped() {
    let network = Arc::new(ScriptedNetwork::new());
    network.respond(&endpoint(), 200, b"");
    let reporter = Arc::new(RecordingReporter::default());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let queue = DeferredQueue::new(
      Arc::new(SqliteOrderStore::new(Arc::clone(&db))),
      network,
      endpoint(),
      reporter.clone(),
    );

    queue.enqueue(&Order::new("a", json!({}))).await.unwrap();
    db.conn()
      .unwrap()
      .execute(
        "INSERT INTO pending_orders (order_id, payload, queued_at) VALUES ('broken', X'00', 'never')",
        [],
      )
      .unwrap();
    queue.enqueue(&Order::new("c", json!({}))).await.unwrap();

    let report = queue.drain().await;
    assert!(!report.aborted);
    assert_eq!(report.synced, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(reporter.kinds(), vec![FailureKind::StorageSoft]);
  }

  #[tokio::test]
  async fn test_unanswered_endpoint_does_not_stall_pass() {
    let origin = silent_server().await;
    let network = NetworkConfig {
      timeout_secs: 1,
      connect_timeout_secs: 1,
    };
    let reporter = Arc::new(RecordingReporter::default());
    let queue = DeferredQueue::new(
      Arc::new(SqliteOrderStore::new(Arc::new(Database::open_in_memory().unwrap()))),
      Arc::new(HttpClient::new(&origin, &network).unwrap()),
      origin.join("/api/orders").unwrap(),
      reporter.clone(),
    );
    queue.enqueue(&Order::new("a", json!({}))).await.unwrap();
    queue.enqueue(&Order::new("b", json!({}))).await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(20), queue.drain())
      .await
      .expect("drain pass never finished");

    assert_eq!(report.pending, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
      reporter.kinds(),
      vec![FailureKind::SyncRetryable, FailureKind::SyncRetryable]
    );
    assert_eq!(queue.pending().await.unwrap().len(), 2);
  }
}
