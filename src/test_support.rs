//! Recording doubles for the network, host and reporter seams.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::cache::{CacheStorage, CachedResponse, RequestKey};
use crate::error::{HostError, NetworkError, StorageError};
use crate::net::{Fetch, Request, Response, ResponseType};
use crate::notify::{Notification, NotificationHost};
use crate::orders::{Order, OrderStore, PendingRow};
use crate::report::{ErrorReporter, Failure, FailureKind};

/// Network that answers from a script; unscripted URLs are unreachable.
#[derive(Default)]
pub struct ScriptedNetwork {
  responses: Mutex<HashMap<String, Response>>,
  rejections: Mutex<Vec<(String, u16)>>,
  requests: Mutex<Vec<Request>>,
}

impl ScriptedNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answer `url` with a same-origin response.
  pub fn respond(&self, url: &Url, status: u16, body: &[u8]) {
    self.respond_with(Response {
      status,
      headers: vec![("content-type".to_string(), "text/plain".to_string())],
      body: body.to_vec(),
      response_type: ResponseType::Basic,
      url: url.clone(),
    });
  }

  pub fn respond_with(&self, response: Response) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(response.url.to_string(), response);
  }

  /// Make `url` unreachable again.
  pub fn go_offline(&self, url: &Url) {
    self.responses.lock().unwrap().remove(url.as_str());
  }

  /// Answer any request whose body contains `needle` with `status`.
  pub fn reject_body_containing(&self, needle: &str, status: u16) {
    self
      .rejections
      .lock()
      .unwrap()
      .push((needle.to_string(), status));
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn calls_to(&self, url: &Url) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.url == *url)
      .count()
  }

  pub fn requests(&self) -> Vec<Request> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Fetch for ScriptedNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    self.requests.lock().unwrap().push(request.clone());

    let body = request
      .body
      .as_deref()
      .map(String::from_utf8_lossy)
      .unwrap_or_default();
    let rejected = self
      .rejections
      .lock()
      .unwrap()
      .iter()
      .find(|(needle, _)| body.contains(needle.as_str()))
      .map(|(_, status)| *status);

    let scripted = self
      .responses
      .lock()
      .unwrap()
      .get(request.url.as_str())
      .cloned();

    match (scripted, rejected) {
      (Some(mut response), Some(status)) => {
        response.status = status;
        Ok(response)
      }
      (Some(response), None) => Ok(response),
      (None, _) => Err(NetworkError::transport(&request.url, "unreachable")),
    }
  }
}

/// Bind a listener that accepts connections and never answers them.
pub async fn silent_server() -> Url {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  tokio::spawn(async move {
    let mut held = Vec::new();
    while let Ok((socket, _)) = listener.accept().await {
      held.push(socket);
    }
  });

  Url::parse(&format!("http://{}/", addr)).unwrap()
}

#[derive(Default)]
pub struct RecordingReporter {
  failures: Mutex<Vec<Failure>>,
}

impl RecordingReporter {
  pub fn kinds(&self) -> Vec<FailureKind> {
    self.failures.lock().unwrap().iter().map(|f| f.kind).collect()
  }
}

impl ErrorReporter for RecordingReporter {
  fn report(&self, failure: Failure) {
    self.failures.lock().unwrap().push(failure);
  }
}

#[derive(Default)]
pub struct RecordingHost {
  shown: Mutex<Vec<Notification>>,
  closed: Mutex<usize>,
  windows: Mutex<Vec<String>>,
}

impl RecordingHost {
  pub fn shown(&self) -> Vec<Notification> {
    self.shown.lock().unwrap().clone()
  }

  pub fn closed(&self) -> usize {
    *self.closed.lock().unwrap()
  }

  pub fn windows(&self) -> Vec<String> {
    self.windows.lock().unwrap().clone()
  }
}

#[async_trait]
impl NotificationHost for RecordingHost {
  async fn show(&self, notification: &Notification) -> Result<(), HostError> {
    self.shown.lock().unwrap().push(notification.clone());
    Ok(())
  }

  async fn close(&self, _notification: &Notification) -> Result<(), HostError> {
    *self.closed.lock().unwrap() += 1;
    Ok(())
  }

  async fn open_or_focus_window(&self, url: &Url) -> Result<(), HostError> {
    self.windows.lock().unwrap().push(url.to_string());
    Ok(())
  }
}

/// Order store whose every operation fails.
pub struct FailingOrderStore;

#[async_trait]
impl OrderStore for FailingOrderStore {
  async fn put(&self, _order: &Order) -> Result<(), StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn pending(&self) -> Result<Vec<PendingRow>, StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn remove(&self, _order_id: &str) -> Result<bool, StorageError> {
    Err(StorageError::Poisoned)
  }
}

/// Cache storage whose every operation fails.
pub struct FailingCacheStorage;

#[async_trait]
impl CacheStorage for FailingCacheStorage {
  async fn open(&self, _generation: &str) -> Result<(), StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn match_entry(
    &self,
    _generation: &str,
    _key: &RequestKey,
  ) -> Result<Option<CachedResponse>, StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn put(
    &self,
    _generation: &str,
    _key: &RequestKey,
    _entry: &CachedResponse,
  ) -> Result<(), StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn put_all(
    &self,
    _generation: &str,
    _entries: &[(RequestKey, CachedResponse)],
  ) -> Result<(), StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn delete(&self, _generation: &str, _key: &RequestKey) -> Result<bool, StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn list_generations(&self) -> Result<Vec<String>, StorageError> {
    Err(StorageError::Poisoned)
  }

  async fn delete_generation(&self, _generation: &str) -> Result<bool, StorageError> {
    Err(StorageError::Poisoned)
  }
}
