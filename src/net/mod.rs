//! Request/response model and the network seam.

mod client;
mod types;

use async_trait::async_trait;

use crate::error::NetworkError;

pub use client::HttpClient;
pub use types::{Destination, Request, Response, ResponseType};

/// Issues a request to the network.
///
/// An `Err` means no response could be obtained at all; HTTP error statuses
/// are returned as ordinary responses.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}
