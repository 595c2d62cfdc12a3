//! Deferred order submission.
//!
//! Orders that could not be delivered are kept in a durable store keyed by
//! order id and resubmitted whenever the host signals that connectivity is
//! back. An order stays queued until the endpoint acknowledges it, so
//! delivery is at-least-once.

mod queue;
mod store;
mod sync;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use queue::{DeferredQueue, DrainReport, Submission};
pub use store::{OrderStore, PendingRow, SqliteOrderStore};
pub use sync::SyncTrigger;

/// An order as submitted to the order endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: String,
  /// Remaining order fields, submitted alongside the id
  #[serde(flatten)]
  pub details: Map<String, Value>,
}

impl Order {
  /// Build an order from a JSON value; non-object values are kept under `payload`.
  pub fn new(id: impl Into<String>, details: Value) -> Self {
    let mut details = match details {
      Value::Object(map) => map,
      other => {
        let mut map = Map::new();
        map.insert("payload".to_string(), other);
        map
      }
    };
    details.remove("id");

    Self {
      id: id.into(),
      details,
    }
  }
}

/// An order waiting in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
  pub order: Order,
  pub queued_at: DateTime<Utc>,
}
