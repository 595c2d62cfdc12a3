//! Asset preloading at install time.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;
use url::Url;

use crate::cache::{CacheLayer, CacheStorage, CachedResponse, RequestKey};
use crate::error::InstallError;
use crate::net::{Fetch, Request};

/// Populates the current generation with the build-time manifest.
pub struct AssetPreloader<C: CacheStorage, F: Fetch> {
  cache: CacheLayer<C>,
  network: Arc<F>,
  manifest: Vec<Url>,
}

impl<C: CacheStorage + 'static, F: Fetch> AssetPreloader<C, F> {
  pub fn new(cache: CacheLayer<C>, network: Arc<F>, manifest: Vec<Url>) -> Self {
    Self {
      cache,
      network,
      manifest,
    }
  }

  /// Fetch every manifest asset and store them as one batch.
  ///
  /// Nothing is written unless every asset came back with a 2xx status.
  pub async fn install(&self) -> Result<usize, InstallError> {
    self.cache.open().await?;
    info!(generation = %self.cache.generation(), "Opened cache");

    let entries = try_join_all(self.manifest.iter().map(|url| self.fetch_asset(url))).await?;

    self.cache.store_all(&entries).await?;
    info!(
      generation = %self.cache.generation(),
      assets = entries.len(),
      "Cached manifest assets"
    );

    Ok(entries.len())
  }

  async fn fetch_asset(&self, url: &Url) -> Result<(RequestKey, CachedResponse), InstallError> {
    let request = Request::get(url.clone());

    let response =
      self
        .network
        .fetch(&request)
        .await
        .map_err(|source| InstallError::AssetUnreachable {
          url: url.to_string(),
          source,
        })?;

    if !response.is_ok() {
      return Err(InstallError::AssetStatus {
        url: url.to_string(),
        status: response.status,
      });
    }

    Ok((RequestKey::from(&request), CachedResponse::snapshot(&response)))
  }
}
