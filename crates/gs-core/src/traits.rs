//! Seams between the loaders and the outside world.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{ParamKind, RequestParams};

/// Remote data source, one call per endpoint.
///
/// Implementations report failures through `Err`; the loaders convert them
/// into retry state and absent values.
#[async_trait]
pub trait Gateway: Send + Sync {
  /// Whether `endpoint` is a known endpoint id.
  fn supports(&self, endpoint: &str) -> bool;

  /// Fetch `endpoint` for one code sent as `param`.
  async fn fetch(&self, endpoint: &str, param: ParamKind, value: &str) -> Result<Value>;

  /// Fetch `endpoint` for several codes in one request.
  async fn fetch_batch(&self, endpoint: &str, codes: &[String]) -> Result<Value>;
}

/// A cached raw gateway payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
  pub data: Value,
  pub timestamp: DateTime<Utc>,
  pub endpoint: String,
  pub params: RequestParams,
}

impl CacheEntry {
  pub fn new(endpoint: &str, params: &RequestParams, data: Value) -> Self {
    Self { data, timestamp: Utc::now(), endpoint: endpoint.to_string(), params: params.clone() }
  }

  pub fn is_expired(&self, ttl: Duration) -> bool {
    Utc::now() - self.timestamp >= ttl
  }
}

/// Key/value store for raw responses, keyed by `(endpoint, params)`.
///
/// `get` only returns entries that have not expired.
#[async_trait]
pub trait ResponseCache: Send + Sync {
  async fn get(&self, endpoint: &str, params: &RequestParams) -> Result<Option<CacheEntry>>;

  async fn put(&self, endpoint: &str, params: &RequestParams, data: Value) -> Result<()>;

  /// Drop every entry.
  async fn clear(&self) -> Result<()>;

  /// Drop expired entries, returning how many were removed.
  async fn cleanup_expired(&self) -> Result<usize>;
}
