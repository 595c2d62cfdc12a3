use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// What an intercepted request is loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
  /// Full-page navigation
  Document,
  Image,
  Script,
  Style,
  Font,
  Manifest,
  /// Programmatic fetch with no destination (e.g. an API call)
  #[default]
  Empty,
  Other,
}

impl Destination {
  pub fn is_navigation(&self) -> bool {
    matches!(self, Destination::Document)
  }
}

/// How a response relates to the origin the worker serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
  /// Same-origin response
  Basic,
  /// Cross-origin response with readable body
  Cors,
  /// Cross-origin response with no readable body
  Opaque,
  /// Synthetic network error response
  Error,
}

/// An outbound request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl Request {
  /// Plain GET with no destination.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      destination: Destination::Empty,
      headers: Vec::new(),
      body: None,
    }
  }

  /// GET for a full-page navigation.
  pub fn navigate(url: Url) -> Self {
    Self::get(url).with_destination(Destination::Document)
  }

  /// POST carrying a JSON body.
  pub fn post_json(url: Url, body: Vec<u8>) -> Self {
    Self {
      method: Method::POST,
      url,
      destination: Destination::Empty,
      headers: vec![("content-type".to_string(), "application/json".to_string())],
      body: Some(body),
    }
  }

  pub fn with_destination(mut self, destination: Destination) -> Self {
    self.destination = destination;
    self
  }
}

/// A response from the network or reconstructed from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub response_type: ResponseType,
  /// Final URL after redirects
  pub url: Url,
}

impl Response {
  /// Whether the status is in the 2xx range.
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Only a plain 200 from our own origin may be stored opportunistically.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.response_type == ResponseType::Basic
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(status: u16, response_type: ResponseType) -> Response {
    Response {
      status,
      headers: vec![("Content-Type".to_string(), "text/html".to_string())],
      body: b"ok".to_vec(),
      response_type,
      url: Url::parse("https://shop.test/").unwrap(),
    }
  }

  #[test]
  fn test_only_basic_200_is_cacheable() {
    assert!(response(200, ResponseType::Basic).is_cacheable());
    assert!(!response(201, ResponseType::Basic).is_cacheable());
    assert!(!response(404, ResponseType::Basic).is_cacheable());
    assert!(!response(200, ResponseType::Cors).is_cacheable());
    assert!(!response(200, ResponseType::Opaque).is_cacheable());
  }

  #[test]
  fn test_is_ok_covers_2xx() {
    assert!(response(204, ResponseType::Basic).is_ok());
    assert!(!response(302, ResponseType::Basic).is_ok());
  }

  #[test]
  fn test_destination_deserializes_lowercase() {
    let d: Destination = serde_json::from_str("\"document\"").unwrap();
    assert!(d.is_navigation());
    assert!(!Destination::Image.is_navigation());
  }
}
