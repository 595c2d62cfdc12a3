//! Single error-reporting collaborator for every failure branch.

use std::fmt;

use tracing::{error, warn};

/// Classification of a failure observed by one of the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// A manifest asset could not be preloaded; installation failed.
  InstallFatal,
  /// A cache or store read/write failed outside of installation.
  StorageSoft,
  /// A sub-resource fetch failed and was propagated to the caller.
  NetworkSoft,
  /// A navigation fetch failed and the offline shell was considered.
  NetworkFallback,
  /// One order could not be resubmitted and stays queued.
  SyncRetryable,
  /// The pending-order store itself could not be read.
  SyncPassFatal,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::InstallFatal => "install-fatal",
      Self::StorageSoft => "storage-soft",
      Self::NetworkSoft => "network-soft",
      Self::NetworkFallback => "network-fallback",
      Self::SyncRetryable => "sync-retryable",
      Self::SyncPassFatal => "sync-pass-fatal",
    };
    f.write_str(name)
  }
}

/// A reported failure: its class, where it happened, and the rendered error.
#[derive(Debug, Clone)]
pub struct Failure {
  pub kind: FailureKind,
  pub context: String,
  pub message: String,
}

impl Failure {
  pub fn new(
    kind: FailureKind,
    context: impl Into<String>,
    err: &(dyn std::error::Error + 'static),
  ) -> Self {
    Self {
      kind,
      context: context.into(),
      message: err.to_string(),
    }
  }
}

/// Receives every failure the core degrades around.
pub trait ErrorReporter: Send + Sync {
  fn report(&self, failure: Failure);
}

/// Reporter that writes failures to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
  fn report(&self, failure: Failure) {
    match failure.kind {
      FailureKind::InstallFatal | FailureKind::SyncPassFatal => error!(
        kind = %failure.kind,
        context = %failure.context,
        "{}",
        failure.message
      ),
      _ => warn!(
        kind = %failure.kind,
        context = %failure.context,
        "{}",
        failure.message
      ),
    }
  }
}
