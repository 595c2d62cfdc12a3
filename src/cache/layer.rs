//! Generation-scoped view over the cache storage.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::StorageError;
use crate::net::Response;
use crate::report::{ErrorReporter, Failure, FailureKind};

use super::traits::{CacheStorage, CachedResponse, RequestKey};

/// Cache layer bound to the current generation.
///
/// Reads and writes made through the layer only ever touch the current
/// generation; other generations are visible only to enumeration and pruning.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  generation: String,
}

impl<S: CacheStorage + 'static> CacheLayer<S> {
  pub fn new(storage: Arc<S>, generation: impl Into<String>) -> Self {
    Self {
      storage,
      generation: generation.into(),
    }
  }

  /// Identifier of the current generation.
  pub fn generation(&self) -> &str {
    &self.generation
  }

  pub fn storage(&self) -> &Arc<S> {
    &self.storage
  }

  /// Create the current generation if it does not exist yet.
  pub async fn open(&self) -> Result<(), StorageError> {
    self.storage.open(&self.generation).await
  }

  pub async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError> {
    self.storage.match_entry(&self.generation, key).await
  }

  pub async fn store(&self, key: &RequestKey, entry: &CachedResponse) -> Result<(), StorageError> {
    self.storage.put(&self.generation, key, entry).await
  }

  pub async fn store_all(
    &self,
    entries: &[(RequestKey, CachedResponse)],
  ) -> Result<(), StorageError> {
    self.storage.put_all(&self.generation, entries).await
  }

  pub async fn remove(&self, key: &RequestKey) -> Result<bool, StorageError> {
    self.storage.delete(&self.generation, key).await
  }

  /// Persist a copy of `response` in the background.
  ///
  /// The caller gets its response without waiting for the write; a failed
  /// write is reported and otherwise ignored.
  pub fn store_in_background(
    &self,
    key: RequestKey,
    response: &Response,
    reporter: Arc<dyn ErrorReporter>,
  ) -> JoinHandle<()> {
    let storage = Arc::clone(&self.storage);
    let generation = self.generation.clone();
    let entry = CachedResponse::snapshot(response);

    tokio::spawn(async move {
      match storage.put(&generation, &key, &entry).await {
        Ok(()) => debug!(url = %key.url(), generation = %generation, "Stored response"),
        Err(e) => reporter.report(Failure::new(
          FailureKind::StorageSoft,
          format!("caching {}", key.url()),
          &e,
        )),
      }
    })
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generation: self.generation.clone(),
    }
  }
}
