//! Core traits and types for the response cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::StorageError;
use crate::net::{Request, Response, ResponseType};

/// Normalized request descriptor used as the cache key.
///
/// Fragments never reach the server, so they are dropped before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
  method: Method,
  url: Url,
}

impl RequestKey {
  pub fn new(method: Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    Self { method, url }
  }

  pub fn get(url: &Url) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// SHA256 of "METHOD url" for stable, fixed-length keys
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl From<&Request> for RequestKey {
  fn from(request: &Request) -> Self {
    Self::new(request.method.clone(), &request.url)
  }
}

/// Immutable snapshot of a stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub url: Url,
  /// When the snapshot was written
  pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
  /// Snapshot a response as of now.
  pub fn snapshot(response: &Response) -> Self {
    Self {
      status: response.status,
      headers: response.headers.clone(),
      body: response.body.clone(),
      url: response.url.clone(),
      stored_at: Utc::now(),
    }
  }

  /// Rebuild a response to hand back to the page.
  pub fn to_response(&self) -> Response {
    Response {
      status: self.status,
      headers: self.headers.clone(),
      body: self.body.clone(),
      response_type: ResponseType::Basic,
      url: self.url.clone(),
    }
  }
}

/// Persistent, generation-partitioned response store.
///
/// Every operation is scoped to a named generation. Writing to a key that
/// already exists replaces it.
#[async_trait]
pub trait CacheStorage: Send + Sync {
  /// Create the generation if it does not exist yet.
  async fn open(&self, generation: &str) -> Result<(), StorageError>;

  /// Look up a stored response.
  async fn match_entry(
    &self,
    generation: &str,
    key: &RequestKey,
  ) -> Result<Option<CachedResponse>, StorageError>;

  /// Store a single response.
  async fn put(
    &self,
    generation: &str,
    key: &RequestKey,
    entry: &CachedResponse,
  ) -> Result<(), StorageError>;

  /// Store several responses; either all are written or none are.
  async fn put_all(
    &self,
    generation: &str,
    entries: &[(RequestKey, CachedResponse)],
  ) -> Result<(), StorageError>;

  /// Remove a single entry. Returns whether it existed.
  async fn delete(&self, generation: &str, key: &RequestKey) -> Result<bool, StorageError>;

  /// Names of every generation present in the store.
  async fn list_generations(&self) -> Result<Vec<String>, StorageError>;

  /// Drop a generation together with all of its entries.
  async fn delete_generation(&self, generation: &str) -> Result<bool, StorageError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_ignores_fragment() {
    let a = RequestKey::get(&Url::parse("https://shop.test/a#top").unwrap());
    let b = RequestKey::get(&Url::parse("https://shop.test/a").unwrap());
    assert_eq!(a, b);
    assert_eq!(a.hash(), b.hash());
  }

  #[test]
  fn test_key_distinguishes_method_and_query() {
    let url = Url::parse("https://shop.test/a").unwrap();
    let get = RequestKey::get(&url);
    let head = RequestKey::new(Method::HEAD, &url);
    let query = RequestKey::get(&Url::parse("https://shop.test/a?x=1").unwrap());
    assert_ne!(get.hash(), head.hash());
    assert_ne!(get.hash(), query.hash());
    assert_eq!(get.hash().len(), 64);
  }
}
