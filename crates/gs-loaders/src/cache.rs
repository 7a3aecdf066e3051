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

//! Response caching for the section loaders.
//!
//! [`CacheHelper`] wraps any [`ResponseCache`] with the enable switch, logging
//! and error swallowing the loaders expect; [`InMemoryResponseCache`] is the
//! process-local store used by default.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gs_loaders::cache::{CacheConfig, CacheHelper, InMemoryResponseCache};
//!
//! let config = CacheConfig::default();
//! let store = Arc::new(InMemoryResponseCache::new(&config));
//! let cache = CacheHelper::new(config, store);
//!
//! if let CacheResult::Hit(raw) = cache.get("poblacion_sexo", &params).await {
//!     // ...
//! }
//! cache.set("poblacion_sexo", &params, raw).await;
//! ```

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use gs_core::{CacheEntry, RequestParams, ResponseCache};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{LoaderError, LoaderResult};

/// Cache configuration shared by the loaders.
#[derive(Debug, Clone)]
pub struct CacheConfig {
  /// Enable caching
  pub enable_cache: bool,
  /// Cache TTL in hours
  pub cache_ttl_hours: i64,
  /// Prefix mixed into every cache key
  pub namespace: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enable_cache: true,
      cache_ttl_hours: gs_core::DEFAULT_CACHE_TTL_HOURS,
      namespace: "geostat".to_string(),
    }
  }
}

impl CacheConfig {
  /// Create config from the environment-level settings
  pub fn from_core(config: &gs_core::Config) -> Self {
    Self { cache_ttl_hours: config.cache_ttl_hours, ..Default::default() }
  }

  /// Builder: set enable_cache
  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enable_cache = enabled;
    self
  }

  /// Builder: set cache_ttl_hours
  pub fn with_ttl_hours(mut self, hours: i64) -> Self {
    self.cache_ttl_hours = hours;
    self
  }

  /// Builder: set namespace
  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  pub fn ttl(&self) -> Duration {
    Duration::hours(self.cache_ttl_hours)
  }
}

/// Result of a cache get operation
#[derive(Debug)]
pub enum CacheResult<T> {
  /// Cache hit with data
  Hit(T),
  /// Cache miss (no data or expired)
  Miss,
  /// Cache disabled
  Skipped,
  /// Cache error (logged, treated as miss)
  Error(String),
}

impl<T> CacheResult<T> {
  /// Returns true if this is a cache hit
  pub fn is_hit(&self) -> bool {
    matches!(self, CacheResult::Hit(_))
  }

  /// Returns true if cache was actually checked (not skipped)
  pub fn was_checked(&self) -> bool {
    !matches!(self, CacheResult::Skipped)
  }

  /// Convert to Option, returning None for non-hits
  pub fn into_option(self) -> Option<T> {
    match self {
      CacheResult::Hit(data) => Some(data),
      _ => None,
    }
  }
}

/// Stable key for `(namespace, endpoint, params)`.
pub fn cache_key(namespace: &str, endpoint: &str, params: &RequestParams) -> String {
  let mut hasher = Sha256::new();
  for part in [namespace, endpoint, params.canonical().as_str()] {
    hasher.update(part.as_bytes());
    hasher.update([0x1f]);
  }
  hex::encode(hasher.finalize())
}

/// Cache front used by the loaders.
///
/// Every failure of the underlying store is logged and reported as a miss or
/// a skipped write; nothing here fails a load.
#[derive(Clone)]
pub struct CacheHelper {
  config: CacheConfig,
  store: Arc<dyn ResponseCache>,
}

impl CacheHelper {
  pub fn new(config: CacheConfig, store: Arc<dyn ResponseCache>) -> Self {
    Self { config, store }
  }

  /// Helper backed by a fresh [`InMemoryResponseCache`]
  pub fn in_memory(config: CacheConfig) -> Self {
    let store = Arc::new(InMemoryResponseCache::new(&config));
    Self::new(config, store)
  }

  /// Get the cache configuration
  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  pub fn is_enabled(&self) -> bool {
    self.config.enable_cache
  }

  /// Get the raw payload cached for `(endpoint, params)`.
  pub async fn get(&self, endpoint: &str, params: &RequestParams) -> CacheResult<Value> {
    if !self.is_enabled() {
      return CacheResult::Skipped;
    }

    match self.store.get(endpoint, params).await {
      Ok(Some(entry)) => {
        info!("📦 Cache hit for {} {}", endpoint, params.canonical());
        CacheResult::Hit(entry.data)
      }
      Ok(None) => {
        debug!("Cache miss for {} {}", endpoint, params.canonical());
        CacheResult::Miss
      }
      Err(e) => {
        debug!("Cache read error for {}: {}", endpoint, e);
        CacheResult::Error(e.to_string())
      }
    }
  }

  /// Store a raw payload. Returns true if it was cached.
  pub async fn set(&self, endpoint: &str, params: &RequestParams, data: Value) -> bool {
    if !self.is_enabled() {
      return false;
    }

    match self.store.put(endpoint, params, data).await {
      Ok(()) => {
        let expires_at = Utc::now() + self.config.ttl();
        debug!("💾 Cached {} {} (expires: {})", endpoint, params.canonical(), expires_at);
        true
      }
      Err(e) => {
        // Don't fail the operation, just warn
        warn!("Failed to cache {}: {}", endpoint, e);
        false
      }
    }
  }

  /// Drop every cached entry.
  pub async fn clear(&self) -> LoaderResult<()> {
    self.store.clear().await.map_err(|e| LoaderError::CacheError(e.to_string()))?;
    info!("🧹 Cleared response cache");
    Ok(())
  }

  /// Clean up expired cache entries, returning the number deleted.
  pub async fn cleanup_expired(&self) -> LoaderResult<usize> {
    match self.store.cleanup_expired().await {
      Ok(deleted_count) => {
        if deleted_count > 0 {
          info!("🧹 Cleaned up {} expired cache entries", deleted_count);
        }
        Ok(deleted_count)
      }
      Err(e) => Err(LoaderError::CacheError(format!("Cache cleanup failed: {}", e))),
    }
  }
}

impl std::fmt::Debug for CacheHelper {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CacheHelper").field("config", &self.config).finish()
  }
}

/// Process-local [`ResponseCache`] with TTL expiry.
///
/// Expired entries are dropped when read and by [`ResponseCache::cleanup_expired`].
#[derive(Debug)]
pub struct InMemoryResponseCache {
  entries: DashMap<String, CacheEntry>,
  ttl: Duration,
  namespace: String,
}

impl InMemoryResponseCache {
  pub fn new(config: &CacheConfig) -> Self {
    Self { entries: DashMap::new(), ttl: config.ttl(), namespace: config.namespace.clone() }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn key(&self, endpoint: &str, params: &RequestParams) -> String {
    cache_key(&self.namespace, endpoint, params)
  }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
  async fn get(
    &self,
    endpoint: &str,
    params: &RequestParams,
  ) -> gs_core::Result<Option<CacheEntry>> {
    let key = self.key(endpoint, params);
    if let Some(entry) = self.entries.get(&key) {
      if !entry.is_expired(self.ttl) {
        return Ok(Some(entry.clone()));
      }
    }
    self.entries.remove_if(&key, |_, entry| entry.is_expired(self.ttl));
    Ok(None)
  }

  async fn put(&self, endpoint: &str, params: &RequestParams, data: Value) -> gs_core::Result<()> {
    let key = self.key(endpoint, params);
    self.entries.insert(key, CacheEntry::new(endpoint, params, data));
    Ok(())
  }

  async fn clear(&self) -> gs_core::Result<()> {
    self.entries.clear();
    Ok(())
  }

  async fn cleanup_expired(&self) -> gs_core::Result<usize> {
    let before = self.entries.len();
    self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
    Ok(before.saturating_sub(self.entries.len()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use gs_core::ParamKind;
  use mockall::mock;
  use serde_json::json;
  use tokio_test::assert_ok;

  mock! {
    pub Store {}

    #[async_trait]
    impl ResponseCache for Store {
      async fn get(&self, endpoint: &str, params: &RequestParams) -> gs_core::Result<Option<CacheEntry>>;
      async fn put(&self, endpoint: &str, params: &RequestParams, data: Value) -> gs_core::Result<()>;
      async fn clear(&self) -> gs_core::Result<()>;
      async fn cleanup_expired(&self) -> gs_core::Result<usize>;
    }
  }

  fn params(code: &str) -> RequestParams {
    RequestParams::single(ParamKind::LocationCode, code)
  }

  #[test]
  fn test_cache_config_defaults() {
    let config = CacheConfig::default();
    assert!(config.enable_cache);
    assert_eq!(config.cache_ttl_hours, 168);
    assert_eq!(config.namespace, "geostat");
  }

  #[test]
  fn test_cache_config_builders() {
    let config = CacheConfig::default().with_ttl_hours(2).with_enabled(false).with_namespace("t");
    assert!(!config.enable_cache);
    assert_eq!(config.ttl(), Duration::hours(2));
    assert_eq!(config.namespace, "t");
  }

  #[test]
  fn test_cache_key_is_stable_and_distinct() {
    let a = cache_key("ns", "poblacion_sexo", &params("1"));
    assert_eq!(a, cache_key("ns", "poblacion_sexo", &params("1")));
    assert_ne!(a, cache_key("ns", "poblacion_sexo", &params("2")));
    assert_ne!(a, cache_key("other", "poblacion_sexo", &params("1")));
    assert_eq!(a.len(), 64);
  }

  #[test]
  fn test_cache_result() {
    let hit: CacheResult<String> = CacheResult::Hit("data".to_string());
    assert!(hit.is_hit());
    assert!(hit.was_checked());
    assert_eq!(hit.into_option(), Some("data".to_string()));

    let skipped: CacheResult<String> = CacheResult::Skipped;
    assert!(!skipped.is_hit());
    assert!(!skipped.was_checked());
  }

  #[tokio::test]
  async fn test_in_memory_round_trip() {
    let cache = CacheHelper::in_memory(CacheConfig::default());
    assert!(matches!(cache.get("religion", &params("1")).await, CacheResult::Miss));

    assert!(cache.set("religion", &params("1"), json!([{"religion": "Catolica"}])).await);
    let hit = cache.get("religion", &params("1")).await.into_option();
    assert_eq!(hit, Some(json!([{"religion": "Catolica"}])));

    assert_ok!(cache.clear().await);
    assert!(!cache.get("religion", &params("1")).await.is_hit());
  }

  #[tokio::test]
  async fn test_in_memory_expiry() {
    let store = InMemoryResponseCache::new(&CacheConfig::default().with_ttl_hours(0));
    store.put("religion", &params("1"), json!([])).await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get("religion", &params("1")).await.unwrap().is_none());
    assert!(store.is_empty());

    store.put("religion", &params("2"), json!([])).await.unwrap();
    assert_eq!(store.cleanup_expired().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_disabled_cache_is_skipped() {
    let mut store = MockStore::new();
    store.expect_get().never();
    store.expect_put().never();

    let cache = CacheHelper::new(CacheConfig::default().with_enabled(false), Arc::new(store));
    assert!(!cache.get("religion", &params("1")).await.was_checked());
    assert!(!cache.set("religion", &params("1"), json!([])).await);
  }

  #[tokio::test]
  async fn test_store_errors_are_swallowed() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_, _| Err(gs_core::Error::Cache("down".to_string())));
    store.expect_put().returning(|_, _, _| Err(gs_core::Error::Cache("down".to_string())));
    store.expect_cleanup_expired().returning(|| Err(gs_core::Error::Cache("down".to_string())));

    let cache = CacheHelper::new(CacheConfig::default(), Arc::new(store));
    assert!(matches!(cache.get("religion", &params("1")).await, CacheResult::Error(_)));
    assert!(!cache.set("religion", &params("1"), json!([])).await);
    assert!(matches!(cache.cleanup_expired().await, Err(LoaderError::CacheError(_))));
  }
}
