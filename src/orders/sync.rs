//! Sync trigger: drains the order queue on its connectivity signal.

use std::sync::Arc;

use tracing::{debug, info};

use crate::net::Fetch;

use super::queue::{DeferredQueue, DrainReport};
use super::store::OrderStore;

/// Turns tagged connectivity signals into drain passes.
pub struct SyncTrigger<O: OrderStore, F: Fetch> {
  tag: String,
  queue: Arc<DeferredQueue<O, F>>,
}

impl<O: OrderStore, F: Fetch> SyncTrigger<O, F> {
  pub fn new(tag: impl Into<String>, queue: Arc<DeferredQueue<O, F>>) -> Self {
    Self {
      tag: tag.into(),
      queue,
    }
  }

  /// Drain the queue if `tag` is ours; other tags belong to someone else.
  pub async fn on_signal(&self, tag: &str) -> Option<DrainReport> {
    if tag != self.tag {
      debug!(tag, "Ignoring sync signal");
      return None;
    }

    let report = self.queue.drain().await;
    info!(
      synced = report.synced.len(),
      pending = report.pending.len(),
      aborted = report.aborted,
      "Background sync finished"
    );
    Some(report)
  }
}
