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

//! Named custom transforms, registered once and referenced by id from
//! section metadata.

use gs_core::Row;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LoaderResult;
use crate::values::{as_number, format_percentage, normalize_rows, number_value, FieldAliases};

/// A custom transform body.
pub type CustomTransformFn = Arc<dyn Fn(&Value) -> LoaderResult<Value> + Send + Sync>;

pub const FIRST_ROW: &str = "first_row";
pub const KEY_VALUE: &str = "key_value";
pub const SEX_DISTRIBUTION: &str = "sex_distribution";

/// Table of custom strategies keyed by a stable id.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
  strategies: HashMap<String, CustomTransformFn>,
}

impl StrategyRegistry {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Registry holding the built-in strategies.
  pub fn with_builtins() -> Self {
    let mut registry = Self::empty();
    registry.register(FIRST_ROW, first_row);
    registry.register(KEY_VALUE, key_value);
    registry.register(SEX_DISTRIBUTION, sex_distribution);
    registry
  }

  pub fn register<F>(&mut self, id: impl Into<String>, strategy: F)
  where
    F: Fn(&Value) -> LoaderResult<Value> + Send + Sync + 'static,
  {
    self.strategies.insert(id.into(), Arc::new(strategy));
  }

  pub fn get(&self, id: &str) -> Option<CustomTransformFn> {
    self.strategies.get(id).cloned()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.strategies.contains_key(id)
  }

  pub fn ids(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
  }
}

impl std::fmt::Debug for StrategyRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StrategyRegistry").field("strategies", &self.ids()).finish()
  }
}

/// The first row only, as a one-element list.
fn first_row(raw: &Value) -> LoaderResult<Value> {
  Ok(Value::Array(normalize_rows(raw).into_iter().take(1).collect()))
}

/// Scalars of the first object as `{indicador, valor}` rows.
fn key_value(raw: &Value) -> LoaderResult<Value> {
  let rows = normalize_rows(raw);
  let Some(Value::Object(first)) = rows.first() else {
    return Ok(json!([]));
  };

  let out = first
    .iter()
    .filter(|(_, value)| !value.is_object() && !value.is_array())
    .map(|(key, value)| json!({"indicador": key, "valor": value}))
    .collect();
  Ok(Value::Array(out))
}

/// Demographic totals as one row per sex with its share of the population.
fn sex_distribution(raw: &Value) -> LoaderResult<Value> {
  let men = FieldAliases::new("hombres");
  let women = FieldAliases::new("mujeres");

  let (mut total_men, mut total_women) = (0.0, 0.0);
  let mut seen = false;
  for item in normalize_rows(raw) {
    let Some(row) = item.as_object() else { continue };
    seen = true;
    total_men += sum_of(&men, row);
    total_women += sum_of(&women, row);
  }

  if !seen {
    return Ok(json!([]));
  }

  let total = total_men + total_women;
  Ok(json!([
    {"sexo": "Hombres", "casos": number_value(total_men), "porcentaje": format_percentage(total_men, total)},
    {"sexo": "Mujeres", "casos": number_value(total_women), "porcentaje": format_percentage(total_women, total)},
  ]))
}

fn sum_of(field: &FieldAliases, row: &Row) -> f64 {
  field.value(row).and_then(as_number).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::LoaderError;

  #[test]
  fn test_builtins_registered() {
    let registry = StrategyRegistry::with_builtins();
    assert_eq!(registry.ids(), vec![FIRST_ROW, KEY_VALUE, SEX_DISTRIBUTION]);
    assert!(registry.get("nope").is_none());
  }

  #[test]
  fn test_register_custom_strategy() {
    let mut registry = StrategyRegistry::empty();
    registry.register("always_fails", |_| Err(LoaderError::TransformError("bad".to_string())));
    let strategy = registry.get("always_fails").unwrap();
    assert!(strategy(&json!([])).is_err());
  }

  #[test]
  fn test_first_row() {
    assert_eq!(first_row(&json!({"data": [{"a": 1}, {"a": 2}]})).unwrap(), json!([{"a": 1}]));
    assert_eq!(first_row(&Value::Null).unwrap(), json!([]));
  }

  #[test]
  fn test_key_value() {
    let out = key_value(&json!({"viviendas": 120, "hogares": 98, "detalle": {"x": 1}})).unwrap();
    assert_eq!(
      out,
      json!([
        {"indicador": "viviendas", "valor": 120},
        {"indicador": "hogares", "valor": 98},
      ])
    );
  }

  #[test]
  fn test_sex_distribution() {
    let out = sex_distribution(&json!([{"hombres": 3, "mujeres": 1, "poblacion_total": 4}])).unwrap();
    assert_eq!(
      out,
      json!([
        {"sexo": "Hombres", "casos": 3, "porcentaje": "75,00 %"},
        {"sexo": "Mujeres", "casos": 1, "porcentaje": "25,00 %"},
      ])
    );
    assert_eq!(sex_distribution(&json!([])).unwrap(), json!([]));
  }
}
