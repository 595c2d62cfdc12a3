//! Error types for the offline core.
//!
//! The application edges (CLI, config, database opening) use `color_eyre`;
//! everything the worker handlers touch returns one of these typed errors so
//! each failure branch can be classified before it is reported.

use thiserror::Error;

/// Failure of the persistent cache or order store.
#[derive(Debug, Error)]
pub enum StorageError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("serialization error: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("storage lock poisoned")]
  Poisoned,

  #[error("corrupt row in {table}: {message}")]
  Corrupt { table: &'static str, message: String },
}

impl StorageError {
  pub fn corrupt(table: &'static str, message: impl std::fmt::Display) -> Self {
    Self::Corrupt {
      table,
      message: message.to_string(),
    }
  }
}

/// Failure to obtain any response from the network.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
  #[error("network request to {url} failed: {message}")]
  Transport { url: String, message: String },

  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl NetworkError {
  pub fn transport(url: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
    Self::Transport {
      url: url.to_string(),
      message: message.to_string(),
    }
  }
}

/// Installation failed; the manifest was not stored.
#[derive(Debug, Error)]
pub enum InstallError {
  #[error("failed to fetch manifest asset {url}: {source}")]
  AssetUnreachable {
    url: String,
    #[source]
    source: NetworkError,
  },

  #[error("manifest asset {url} returned status {status}")]
  AssetStatus { url: String, status: u16 },

  #[error("failed to store manifest: {0}")]
  Storage(#[from] StorageError),
}

/// An intercepted request that produced no response.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error(transparent)]
  Network(#[from] NetworkError),
}

/// The host platform refused a notification or window request.
#[derive(Debug, Error)]
#[error("host could not {action}: {message}")]
pub struct HostError {
  pub action: &'static str,
  pub message: String,
}

/// A single order submission that was not acknowledged.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error(transparent)]
  Network(#[from] NetworkError),

  #[error("order endpoint answered with status {0}")]
  Rejected(u16),

  #[error("failed to encode order: {0}")]
  Encode(#[from] serde_json::Error),
}
