//! Shared fixtures for loader integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gs_core::{Error, Gateway, ParamKind, Result};
use gs_loaders::{LoaderConfig, SectionDataLoader, SectionRegistry};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process gateway recording every call it receives.
#[derive(Default)]
pub struct StubGateway {
  endpoints: HashSet<String>,
  responses: HashMap<(String, String), Value>,
  batch_responses: HashMap<String, Value>,
  delays: HashMap<String, Duration>,
  failing: Mutex<HashSet<String>>,
  calls: AtomicUsize,
  log: Mutex<Vec<String>>,
}

impl StubGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_endpoint(mut self, endpoint: &str) -> Self {
    self.endpoints.insert(endpoint.to_string());
    self
  }

  /// Payload for `endpoint` fetched with `code`.
  pub fn respond(mut self, endpoint: &str, code: &str, raw: Value) -> Self {
    self.endpoints.insert(endpoint.to_string());
    self.responses.insert((endpoint.to_string(), code.to_string()), raw);
    self
  }

  pub fn respond_batch(mut self, endpoint: &str, raw: Value) -> Self {
    self.endpoints.insert(endpoint.to_string());
    self.batch_responses.insert(endpoint.to_string(), raw);
    self
  }

  /// Delay every call made with `code`.
  pub fn delay(mut self, code: &str, millis: u64) -> Self {
    self.delays.insert(code.to_string(), Duration::from_millis(millis));
    self
  }

  pub fn failing(self, endpoint: &str) -> Self {
    self.set_failing(endpoint, true);
    self
  }

  pub fn set_failing(&self, endpoint: &str, failing: bool) {
    let mut set = self.failing.lock().unwrap();
    if failing {
      set.insert(endpoint.to_string());
    } else {
      set.remove(endpoint);
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Calls made to `endpoint`, single or batched.
  pub fn calls_to(&self, endpoint: &str) -> usize {
    self.log().iter().filter(|entry| entry.split(' ').nth(1) == Some(endpoint)).count()
  }

  pub fn log(&self) -> Vec<String> {
    self.log.lock().unwrap().clone()
  }

  async fn record(&self, entry: String, code: &str) -> Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.log.lock().unwrap().push(entry);
    if let Some(delay) = self.delays.get(code) {
      tokio::time::sleep(*delay).await;
    }
    Ok(())
  }

  fn check_failing(&self, endpoint: &str) -> Result<()> {
    if self.failing.lock().unwrap().contains(endpoint) {
      return Err(Error::Http("503 Service Unavailable".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl Gateway for StubGateway {
  fn supports(&self, endpoint: &str) -> bool {
    self.endpoints.contains(endpoint)
  }

  async fn fetch(&self, endpoint: &str, param: ParamKind, value: &str) -> Result<Value> {
    self.record(format!("GET {} {}={}", endpoint, param, value), value).await?;
    self.check_failing(endpoint)?;
    Ok(
      self
        .responses
        .get(&(endpoint.to_string(), value.to_string()))
        .cloned()
        .unwrap_or_else(|| json!([])),
    )
  }

  async fn fetch_batch(&self, endpoint: &str, codes: &[String]) -> Result<Value> {
    self.record(format!("POST {} {}", endpoint, codes.join(",")), "").await?;
    self.check_failing(endpoint)?;
    Ok(self.batch_responses.get(endpoint).cloned().unwrap_or_else(|| json!([])))
  }
}

pub fn registry() -> SectionRegistry {
  SectionRegistry::from_json_str(
    &json!({
      "sections": {
        "demografia": {
          "fields": [
            { "name": "poblacion", "endpoint": "poblacion_sexo", "aggregatable": true }
          ]
        },
        "resumen": {
          "fields": [
            { "name": "habitantes", "endpoint": "poblacion_sexo", "aggregatable": true },
            { "name": "sexo", "endpoint": "poblacion_sexo",
              "transform": { "type": "custom", "strategy": "sex_distribution" } }
          ]
        },
        "territorio": {
          "fields": [
            { "name": "centros", "endpoint": "centros_poblados", "aggregatable": true },
            { "name": "listado", "endpoint": "centros_poblados", "method": "POST" }
          ]
        },
        "salud": {
          "fields": [
            { "name": "seguro", "endpoint": "seguro_salud", "aggregatable": true,
              "param_kind": "distrito" }
          ]
        },
        "cultura": {
          "fields": [
            { "name": "religion", "endpoint": "religion",
              "transform": { "type": "standard", "category_field": "religion" } },
            { "name": "idioma", "endpoint": "idioma" },
            { "name": "fantasma", "endpoint": "inexistente" }
          ]
        }
      }
    })
    .to_string(),
  )
  .unwrap()
}

/// Loader with no in-flight grace, so every sequential load starts fresh.
pub fn loader(gateway: Arc<StubGateway>) -> SectionDataLoader {
  SectionDataLoader::from_registry(gateway, registry())
    .with_config(LoaderConfig::default().with_inflight_grace(Duration::ZERO))
}
