//! Cache generation cleanup at activation.

use std::sync::Arc;

use tracing::info;

use crate::cache::CacheStorage;
use crate::error::StorageError;
use crate::report::{ErrorReporter, Failure, FailureKind};

/// Deletes every cache generation other than the current one.
///
/// This is the only eviction there is: no per-entry expiry or size bound.
pub struct GenerationManager<C: CacheStorage> {
  storage: Arc<C>,
  current: String,
  reporter: Arc<dyn ErrorReporter>,
}

impl<C: CacheStorage> GenerationManager<C> {
  pub fn new(storage: Arc<C>, current: impl Into<String>, reporter: Arc<dyn ErrorReporter>) -> Self {
    Self {
      storage,
      current: current.into(),
      reporter,
    }
  }

  /// Remove stale generations, returning the ids that were deleted.
  ///
  /// A generation that fails to delete is reported and left for the next
  /// activation; the others are still removed.
  pub async fn activate(&self) -> Result<Vec<String>, StorageError> {
    let generations = self.storage.list_generations().await?;
    let mut deleted = Vec::new();

    for generation in generations.into_iter().filter(|g| *g != self.current) {
      info!(generation = %generation, "Deleting old cache");
      match self.storage.delete_generation(&generation).await {
        Ok(_) => deleted.push(generation),
        Err(e) => self.reporter.report(Failure::new(
          FailureKind::StorageSoft,
          format!("deleting cache generation {}", generation),
          &e,
        )),
      }
    }

    Ok(deleted)
  }
}
