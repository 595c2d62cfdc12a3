//! Cache-first fetch interception.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheLayer, CacheStorage, RequestKey};
use crate::error::{FetchError, NetworkError};
use crate::net::{Fetch, Request, Response};
use crate::report::{ErrorReporter, Failure, FailureKind};

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
  Cache,
  Network,
  /// Cached root document served for a failed navigation
  OfflineShell,
}

/// The response for one intercepted request, plus any background cache write
/// started on its behalf.
#[derive(Debug)]
pub struct Interception {
  pub response: Response,
  pub source: ResponseSource,
  background: Option<JoinHandle<()>>,
}

impl Interception {
  fn new(response: Response, source: ResponseSource) -> Self {
    Self {
      response,
      source,
      background: None,
    }
  }

  /// Wait for the opportunistic cache write, if one was started.
  ///
  /// Returns false when the write task died instead of finishing.
  pub async fn settled(&mut self) -> bool {
    match self.background.take() {
      Some(handle) => match handle.await {
        Ok(()) => true,
        Err(e) => {
          warn!(url = %self.response.url, error = %e, "Background cache write did not finish");
          false
        }
      },
      None => true,
    }
  }
}

/// Decides, per request, between the cache, the network and the offline shell.
pub struct FetchInterceptor<C: CacheStorage, F: Fetch> {
  cache: CacheLayer<C>,
  network: Arc<F>,
  root_document: Url,
  reporter: Arc<dyn ErrorReporter>,
}

impl<C: CacheStorage + 'static, F: Fetch> FetchInterceptor<C, F> {
  pub fn new(
    cache: CacheLayer<C>,
    network: Arc<F>,
    root_document: Url,
    reporter: Arc<dyn ErrorReporter>,
  ) -> Self {
    Self {
      cache,
      network,
      root_document,
      reporter,
    }
  }

  /// Produce exactly one response for `request`, or the network failure.
  ///
  /// 1. A cached entry is returned as-is, without touching the network.
  /// 2. Otherwise the network answers. Only a same-origin 200 is copied into
  ///    the cache, in the background.
  /// 3. If the network is unreachable, navigations fall back to the cached
  ///    root document; everything else fails.
  pub async fn intercept(&self, request: &Request) -> Result<Interception, FetchError> {
    // Only GET requests can be stored or matched
    let cacheable = request.method == Method::GET;
    let key = RequestKey::from(request);

    if cacheable {
      match self.cache.lookup(&key).await {
        Ok(Some(entry)) => {
          debug!(url = %request.url, "Serving from cache");
          return Ok(Interception::new(entry.to_response(), ResponseSource::Cache));
        }
        Ok(None) => {}
        Err(e) => self.reporter.report(Failure::new(
          FailureKind::StorageSoft,
          format!("cache lookup for {}", request.url),
          &e,
        )),
      }
    }

    let response = match self.network.fetch(request).await {
      Ok(response) => response,
      Err(e) => return self.fallback(request, e).await,
    };

    if !cacheable || !response.is_cacheable() {
      debug!(
        url = %request.url,
        status = response.status,
        "Passing network response through uncached"
      );
      return Ok(Interception::new(response, ResponseSource::Network));
    }

    debug!(url = %request.url, "Serving from network, caching copy");
    let background = self
      .cache
      .store_in_background(key, &response, Arc::clone(&self.reporter));

    Ok(Interception {
      response,
      source: ResponseSource::Network,
      background: Some(background),
    })
  }

  async fn fallback(&self, request: &Request, err: NetworkError) -> Result<Interception, FetchError> {
    let context = format!("fetching {}", request.url);

    if !request.destination.is_navigation() {
      self
        .reporter
        .report(Failure::new(FailureKind::NetworkSoft, context, &err));
      return Err(err.into());
    }

    self
      .reporter
      .report(Failure::new(FailureKind::NetworkFallback, context, &err));

    match self.cache.lookup(&RequestKey::get(&self.root_document)).await {
      Ok(Some(shell)) => {
        debug!(url = %request.url, "Serving offline shell");
        Ok(Interception::new(shell.to_response(), ResponseSource::OfflineShell))
      }
      Ok(None) => Err(err.into()),
      Err(e) => {
        self.reporter.report(Failure::new(
          FailureKind::StorageSoft,
          "offline shell lookup",
          &e,
        ));
        Err(err.into())
      }
    }
  }
}
