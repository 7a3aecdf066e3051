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

//! The section data loader.
//!
//! [`SectionDataLoader::load_section_data`] resolves a section into its
//! fields, loads every field concurrently and returns `field -> value`.
//! Per field:
//!
//! 1. endpoints the gateway does not know resolve to `[]`
//! 2. a request key that failed `max_retries` times resolves to `null`
//! 3. non-aggregatable fields are served from cache, then joined with an
//!    identical load already in flight, then fetched
//! 4. aggregatable fields with several codes fetch each code on its own
//!    (cached per code) and merge the raw results before transforming
//!
//! Failures never reach the caller; they are counted against the request key
//! and the field resolves to `null`.

use futures::future::{join_all, FutureExt};
use gs_core::{Codes, Gateway, HttpMethod, RequestParams};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::aggregation::AggregationRules;
use crate::cache::{CacheConfig, CacheHelper, CacheResult};
use crate::error::{LoaderError, LoaderResult};
use crate::mapping::{FieldMapping, FieldMappingResolver, SectionRegistry};
use crate::request_state::{
  fetch_request_key, field_request_key, InFlight, RequestState, RetryState,
};
use crate::transform::TransformFactory;

/// Configuration for the section loader
#[derive(Debug, Clone)]
pub struct LoaderConfig {
  /// Failed attempts allowed per request key
  pub max_retries: u32,

  /// How long a finished in-flight load stays joinable
  pub inflight_grace: Duration,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      max_retries: gs_core::MAX_RETRIES,
      inflight_grace: Duration::from_millis(gs_core::DEFAULT_INFLIGHT_GRACE_MS),
    }
  }
}

impl LoaderConfig {
  pub fn from_core(config: &gs_core::Config) -> Self {
    Self { inflight_grace: Duration::from_millis(config.inflight_grace_ms), ..Default::default() }
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_inflight_grace(mut self, grace: Duration) -> Self {
    self.inflight_grace = grace;
    self
  }
}

/// Loads report sections through a [`Gateway`], cache-first.
///
/// Cloning is cheap and clones share retry state, in-flight loads and cache.
#[derive(Clone)]
pub struct SectionDataLoader {
  gateway: Arc<dyn Gateway>,
  cache: CacheHelper,
  resolver: Arc<FieldMappingResolver>,
  rules: Arc<AggregationRules>,
  state: Arc<RequestState>,
  config: LoaderConfig,
}

impl SectionDataLoader {
  pub fn new(gateway: Arc<dyn Gateway>, resolver: FieldMappingResolver, cache: CacheHelper) -> Self {
    let config = LoaderConfig::default();
    let rules = AggregationRules::default().with_rules_first(resolver.registry().aggregation.clone());
    Self {
      gateway,
      cache,
      resolver: Arc::new(resolver),
      rules: Arc::new(rules),
      state: Arc::new(RequestState::new(config.max_retries)),
      config,
    }
  }

  /// Loader over `registry` with built-in strategies and an in-memory cache.
  pub fn from_registry(gateway: Arc<dyn Gateway>, registry: SectionRegistry) -> Self {
    let resolver = FieldMappingResolver::new(registry, TransformFactory::default());
    Self::new(gateway, resolver, CacheHelper::in_memory(CacheConfig::default()))
  }

  /// Builder: replace the loader configuration. Resets retry state.
  pub fn with_config(mut self, config: LoaderConfig) -> Self {
    self.state = Arc::new(RequestState::new(config.max_retries));
    self.config = config;
    self
  }

  /// Builder: replace the whole aggregation rule table
  pub fn with_aggregation_rules(mut self, rules: AggregationRules) -> Self {
    self.rules = Arc::new(rules);
    self
  }

  pub fn config(&self) -> &LoaderConfig {
    &self.config
  }

  pub fn resolver(&self) -> &FieldMappingResolver {
    &self.resolver
  }

  /// Load every field of `section` for `codes`.
  ///
  /// Unknown sections and empty code lists give an empty map. Fields that
  /// fail are present with `null`.
  #[instrument(skip(self, codes), fields(codes = tracing::field::Empty))]
  pub async fn load_section_data(
    &self,
    section: &str,
    codes: impl Into<Codes>,
    force_refresh: bool,
  ) -> Map<String, Value> {
    let codes = codes.into();
    tracing::Span::current().record("codes", codes.as_slice().join(",").as_str());

    let Some(config) = self.resolver.resolve(section) else {
      debug!("Unknown section {}", section);
      return Map::new();
    };
    if codes.is_empty() {
      debug!("No codes given for section {}", section);
      return Map::new();
    }

    let loads = config.fields().iter().map(|field| {
      let codes = &codes;
      async move {
        let value = AssertUnwindSafe(self.load_field(section, field, codes, force_refresh))
          .catch_unwind()
          .await
          .unwrap_or_else(|_| {
            warn!("Field {}.{} panicked while loading", section, field.field_name);
            Value::Null
          });
        (field.field_name.clone(), value)
      }
    });
    let values: Map<String, Value> = join_all(loads).await.into_iter().collect();

    let missing = values.values().filter(|v| v.is_null()).count();
    info!("Loaded section {} ({} fields, {} missing)", section, values.len(), missing);
    values
  }

  /// Clear retry counters for endpoints containing `filter`, or all of them.
  pub fn reset_retries(&self, filter: Option<&str>) -> usize {
    self.state.reset_retries(filter)
  }

  pub fn reset_all_retries(&self) -> usize {
    self.state.reset_all_retries()
  }

  /// Drop every cached response. Failures are logged.
  pub async fn clear_cache(&self) {
    if let Err(e) = self.cache.clear().await {
      warn!("Failed to clear cache: {}", e);
    }
  }

  pub async fn cleanup_expired_cache(&self) -> LoaderResult<usize> {
    self.cache.cleanup_expired().await
  }

  /// Retry state of a request key, see [`crate::field_request_key`].
  pub fn retry_state(&self, key: &str) -> Option<RetryState> {
    self.state.retry_state(key)
  }

  pub fn in_flight_count(&self) -> usize {
    self.state.in_flight_count()
  }

  async fn load_field(
    &self,
    section: &str,
    field: &FieldMapping,
    codes: &Codes,
    force_refresh: bool,
  ) -> Value {
    if !self.gateway.supports(&field.endpoint) {
      debug!("Endpoint {} is not mapped, {} resolves empty", field.endpoint, field.field_name);
      return Value::Array(Vec::new());
    }

    let params = request_params(field, codes);
    let key = field_request_key(&field.field_name, &field.endpoint, &params);

    if self.state.is_exhausted(&key) {
      warn!(
        "Retry limit reached for {} ({}), skipping until reset",
        field.field_name, field.endpoint
      );
      return Value::Null;
    }

    if field.aggregatable {
      return self.execute(section, field, codes, &params, &key, force_refresh).await;
    }

    if !force_refresh {
      if let CacheResult::Hit(raw) = self.cache.get(&field.endpoint, &params).await {
        return field.transform.apply(&raw).unwrap_or_else(|e| {
          warn!("Cached payload for {} failed to transform: {}", field.field_name, e);
          Value::Null
        });
      }
    }

    let loader = self.clone();
    let owned = (section.to_string(), field.clone(), codes.clone(), params, key.clone());
    let slot = self.state.join_or_start(&key, move |id| {
      async move {
        let (section, field, codes, params, key) = owned;
        let value = AssertUnwindSafe(
          loader.execute(&section, &field, &codes, &params, &key, force_refresh),
        )
        .catch_unwind()
        .await
        .unwrap_or(Value::Null);
        loader.release_in_flight(key, id);
        value
      }
      .boxed()
    });

    match slot {
      InFlight::Joined(load) => {
        debug!("Joining in-flight load of {} ({})", field.field_name, field.endpoint);
        load.await
      }
      InFlight::Started { load, .. } => load.await,
    }
  }

  /// Fetch, transform and record the outcome against `key`.
  async fn execute(
    &self,
    section: &str,
    field: &FieldMapping,
    codes: &Codes,
    params: &RequestParams,
    key: &str,
    force_refresh: bool,
  ) -> Value {
    let outcome = match self.fetch_raw(section, field, codes, force_refresh).await {
      Ok(raw) => field.transform.apply(&raw).map(|value| (raw, value)),
      Err(e) => Err(e),
    };

    match outcome {
      Ok((raw, value)) => {
        self.state.record_success(key);
        if !field.aggregatable {
          self.cache.set(&field.endpoint, params, raw).await;
        }
        value
      }
      Err(e) => {
        let retries = self.state.record_failure(key, &field.endpoint, &e.to_string());
        warn!(
          "Failed to load {} ({}), attempt {}/{}: {}",
          field.field_name,
          field.endpoint,
          retries,
          self.state.max_retries(),
          e
        );
        Value::Null
      }
    }
  }

  async fn fetch_raw(
    &self,
    section: &str,
    field: &FieldMapping,
    codes: &Codes,
    force_refresh: bool,
  ) -> LoaderResult<Value> {
    if codes.is_multiple() {
      if field.method == HttpMethod::Post {
        debug!("Batch fetch of {} for {} codes", field.endpoint, codes.len());
        return Ok(self.gateway.fetch_batch(&field.endpoint, codes.as_slice()).await?);
      }
      if field.aggregatable {
        return Ok(self.fetch_aggregated(section, field, codes.as_slice(), force_refresh).await);
      }
    }

    let code = codes
      .first()
      .ok_or_else(|| LoaderError::InvalidData("no location code given".to_string()))?;
    Ok(self.gateway.fetch(&field.endpoint, field.param_kind, code).await?)
  }

  /// Fan out one fetch per code and merge the raw results.
  async fn fetch_aggregated(
    &self,
    section: &str,
    field: &FieldMapping,
    codes: &[String],
    force_refresh: bool,
  ) -> Value {
    let per_code =
      join_all(codes.iter().map(|code| self.fetch_for_code(field, code, force_refresh))).await;
    let strategy = self.rules.select(section, &field.endpoint);
    debug!("Merging {} results for {} with {:?}", per_code.len(), field.endpoint, strategy);
    strategy.merge(&per_code)
  }

  /// One code of an aggregated fan-out. Failures contribute `[]`.
  async fn fetch_for_code(&self, field: &FieldMapping, code: &str, force_refresh: bool) -> Value {
    let params = RequestParams::single(field.param_kind, code);
    let key = fetch_request_key(&field.endpoint, &params);

    if self.state.is_exhausted(&key) {
      warn!("Retry limit reached for {} code {}, skipping", field.endpoint, code);
      return Value::Array(Vec::new());
    }

    if !force_refresh {
      if let CacheResult::Hit(raw) = self.cache.get(&field.endpoint, &params).await {
        return raw;
      }
    }

    match self.gateway.fetch(&field.endpoint, field.param_kind, code).await {
      Ok(raw) => {
        self.state.record_success(&key);
        self.cache.set(&field.endpoint, &params, raw.clone()).await;
        raw
      }
      Err(e) => {
        let retries = self.state.record_failure(&key, &field.endpoint, &e.to_string());
        warn!("Failed to load {} for code {} (attempt {}): {}", field.endpoint, code, retries, e);
        Value::Array(Vec::new())
      }
    }
  }

  fn release_in_flight(&self, key: String, id: u64) {
    let grace = self.config.inflight_grace;
    if grace.is_zero() {
      self.state.finish_in_flight(&key, id);
      return;
    }
    let state = Arc::clone(&self.state);
    tokio::spawn(async move {
      tokio::time::sleep(grace).await;
      state.finish_in_flight(&key, id);
    });
  }
}

impl std::fmt::Debug for SectionDataLoader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SectionDataLoader")
      .field("config", &self.config)
      .field("state", &self.state)
      .field("cache", &self.cache)
      .finish()
  }
}

/// Request parameters for a field: one code by its parameter kind, several as
/// a code list.
pub fn request_params(field: &FieldMapping, codes: &Codes) -> RequestParams {
  match codes.as_slice() {
    [code] => RequestParams::single(field.param_kind, code),
    many => RequestParams::batch(many),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transform::Transform;
  use gs_core::ParamKind;
  use serde_json::json;

  fn field(param_kind: ParamKind) -> FieldMapping {
    FieldMapping {
      field_name: "religion".to_string(),
      endpoint: "religion".to_string(),
      method: HttpMethod::Get,
      param_kind,
      aggregatable: false,
      transform: Transform::passthrough(),
    }
  }

  #[test]
  fn test_loader_config_default() {
    let config = LoaderConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.inflight_grace, Duration::from_millis(500));
  }

  #[test]
  fn test_loader_config_from_core() {
    let mut core = gs_core::Config::default_with_base_url("https://mock.geostat.test");
    core.inflight_grace_ms = 40;
    core.max_retries = 9;
    let config = LoaderConfig::from_core(&core);
    assert_eq!(config.inflight_grace, Duration::from_millis(40));
    assert_eq!(config.max_retries, 3);

    let config = config.with_max_retries(1).with_inflight_grace(Duration::ZERO);
    assert_eq!(config.max_retries, 1);
    assert!(config.inflight_grace.is_zero());
  }

  #[test]
  fn test_request_params_single_code() {
    let params = request_params(&field(ParamKind::District), &Codes::from("150101"));
    assert_eq!(params.get("distrito"), Some(&json!("150101")));
  }

  #[test]
  fn test_request_params_code_list() {
    let params = request_params(&field(ParamKind::District), &Codes::from(vec!["2", "1"]));
    assert_eq!(params.canonical(), r#"{"codigos":["2","1"]}"#);

    let one = request_params(&field(ParamKind::LocationCode), &Codes::from(vec!["7"]));
    assert_eq!(one.get("ubigeo"), Some(&json!("7")));
  }
}
