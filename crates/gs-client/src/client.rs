/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use crate::endpoints::EndpointCatalog;
use crate::transport::Transport;
use async_trait::async_trait;
use gs_core::{Config, Error, Gateway, ParamKind, Result, BATCH_PARAM};
use governor::{
  Quota, RateLimiter,
  clock::DefaultClock,
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
};
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// HTTP [`Gateway`] for the statistics API
///
/// Resolves endpoint ids through an [`EndpointCatalog`], spaces requests with
/// a rate limiter and delegates the wire work to [`Transport`].
///
/// # Examples
///
/// ```ignore
/// use gs_client::GeoStatClient;
/// use gs_core::{Config, Gateway, ParamKind};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = GeoStatClient::new(Config::from_env()?)?;
///     let raw = client.fetch("poblacion_sexo", ParamKind::LocationCode, "150101").await?;
///     println!("{}", raw);
///     Ok(())
/// }
/// ```
pub struct GeoStatClient {
  rate_limiter: Arc<DirectRateLimiter>,
  transport: Arc<Transport>,
  endpoints: EndpointCatalog,
}

impl GeoStatClient {
  /// Create a new client with the default endpoint catalog
  ///
  /// # Errors
  ///
  /// Returns an error if the HTTP client cannot be created.
  pub fn new(config: Config) -> Result<Self> {
    // Ensure rate_limit is non-zero, fallback to default if invalid
    let rate_limit_value = NonZeroU32::new(config.rate_limit)
      .or_else(|| NonZeroU32::new(gs_core::DEFAULT_RATE_LIMIT))
      .ok_or_else(|| Error::Config("rate limit must be non-zero".to_string()))?;
    let quota = Quota::per_minute(rate_limit_value);
    let rate_limiter = Arc::new(RateLimiter::direct(quota));

    let transport = Arc::new(Transport::new(&config)?);

    Ok(Self { rate_limiter, transport, endpoints: EndpointCatalog::with_defaults() })
  }

  /// Builder: replace the endpoint catalog
  pub fn with_endpoints(mut self, endpoints: EndpointCatalog) -> Self {
    self.endpoints = endpoints;
    self
  }

  pub fn endpoints(&self) -> &EndpointCatalog {
    &self.endpoints
  }

  /// Wait for rate limit to allow next request
  pub async fn wait_for_rate_limit(&self) -> Result<()> {
    self.rate_limiter.until_ready().await;
    Ok(())
  }

  fn path_for(&self, endpoint: &str) -> Result<&str> {
    self.endpoints.path(endpoint).ok_or_else(|| Error::UnknownEndpoint(endpoint.to_string()))
  }
}

#[async_trait]
impl Gateway for GeoStatClient {
  fn supports(&self, endpoint: &str) -> bool {
    self.endpoints.contains(endpoint)
  }

  async fn fetch(&self, endpoint: &str, param: ParamKind, value: &str) -> Result<Value> {
    let path = self.path_for(endpoint)?;
    self.wait_for_rate_limit().await?;
    debug!("Fetching {} with {}={}", endpoint, param, value);
    self.transport.get(path, &[(param.wire_name(), value)]).await
  }

  async fn fetch_batch(&self, endpoint: &str, codes: &[String]) -> Result<Value> {
    let path = self.path_for(endpoint)?;
    self.wait_for_rate_limit().await?;
    debug!("Fetching {} for {} codes", endpoint, codes.len());
    let mut body = serde_json::Map::new();
    body.insert(BATCH_PARAM.to_string(), json!(codes));
    self.transport.post(path, &Value::Object(body)).await
  }
}

impl std::fmt::Debug for GeoStatClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GeoStatClient")
      .field("transport", &self.transport)
      .field("endpoints", &self.endpoints.len())
      .field("rate_limiter", &"RateLimiter")
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_client_creation() {
    let config = Config::default_with_base_url("http://localhost:9000");
    let client = GeoStatClient::new(config).expect("Failed to create client");
    assert!(client.supports("poblacion_sexo"));
    assert!(!client.supports("unknown_endpoint"));
  }

  #[test]
  fn test_zero_rate_limit_falls_back_to_default() {
    let config = Config { rate_limit: 0, ..Config::default_with_base_url("http://localhost:9000") };
    assert!(GeoStatClient::new(config).is_ok());
  }

  #[tokio::test]
  async fn test_unknown_endpoint_is_rejected_without_request() {
    let client = GeoStatClient::new(Config::default_with_base_url("http://127.0.0.1:9"))
      .unwrap()
      .with_endpoints(EndpointCatalog::empty());
    let err = client.fetch("poblacion_sexo", ParamKind::LocationCode, "1").await.unwrap_err();
    assert!(matches!(err, Error::UnknownEndpoint(_)));
  }
}
