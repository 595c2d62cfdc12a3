use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use url::{Origin, Url};

use crate::config::NetworkConfig;
use crate::error::NetworkError;

use super::types::{Request, Response, ResponseType};
use super::Fetch;

/// Network client backed by reqwest.
///
/// Responses whose final URL leaves the configured origin are classified as
/// `Cors` so the interceptor never stores them. Every request is bounded by
/// the configured timeouts; an unanswered request fails as a transport error.
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  origin: Origin,
}

impl HttpClient {
  pub fn new(origin: &Url, network: &NetworkConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("storefront-offline/", env!("CARGO_PKG_VERSION")))
      .timeout(network.timeout())
      .connect_timeout(network.connect_timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      origin: origin.origin(),
    })
  }
}

fn classify(origin: &Origin, final_url: &Url) -> ResponseType {
  if final_url.origin() == *origin {
    ResponseType::Basic
  } else {
    ResponseType::Cors
  }
}

#[async_trait]
impl Fetch for HttpClient {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());

    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| NetworkError::transport(&request.url, e))?;

    let status = response.status().as_u16();
    let url = response.url().clone();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| NetworkError::transport(&request.url, e))?
      .to_vec();

    Ok(Response {
      status,
      headers,
      body,
      response_type: classify(&self.origin, &url),
      url,
    })
  }
}
