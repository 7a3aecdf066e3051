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

//! Standard transform: one row per item with a category and a count.

use gs_core::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{LoaderError, LoaderResult};
use crate::values::{as_number, normalize_rows, number_value, FieldAliases};

/// Category written when a row has none.
pub const UNCATEGORIZED: &str = "uncategorized";

fn default_category_field() -> String {
  "categoria".to_string()
}

fn default_count_field() -> String {
  "casos".to_string()
}

fn default_category() -> String {
  UNCATEGORIZED.to_string()
}

/// Declarative options for the standard transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardConfig {
  /// Source field holding the category
  #[serde(default = "default_category_field")]
  pub category_field: String,

  /// Source field holding the count
  #[serde(default = "default_count_field")]
  pub count_field: String,

  /// Output key for the category, defaults to `category_field`
  #[serde(default)]
  pub category_key: Option<String>,

  /// Output key for the count, defaults to `count_field`
  #[serde(default)]
  pub count_key: Option<String>,

  /// Extra output fields, output key -> source field
  #[serde(default)]
  pub field_map: BTreeMap<String, String>,

  #[serde(default = "default_category")]
  pub default_category: String,
}

impl Default for StandardConfig {
  fn default() -> Self {
    Self {
      category_field: default_category_field(),
      count_field: default_count_field(),
      category_key: None,
      count_key: None,
      field_map: BTreeMap::new(),
      default_category: default_category(),
    }
  }
}

/// Compiled form of [`StandardConfig`] with alias tables resolved.
#[derive(Debug, Clone)]
pub struct StandardTransform {
  category: FieldAliases,
  count: FieldAliases,
  category_key: String,
  count_key: String,
  mapped: Vec<(String, FieldAliases)>,
  default_category: String,
}

impl StandardTransform {
  pub fn new(config: &StandardConfig) -> Self {
    Self {
      category: FieldAliases::new(&config.category_field),
      count: FieldAliases::new(&config.count_field),
      category_key: config.category_key.clone().unwrap_or_else(|| config.category_field.clone()),
      count_key: config.count_key.clone().unwrap_or_else(|| config.count_field.clone()),
      mapped: config
        .field_map
        .iter()
        .map(|(target, source)| (target.clone(), FieldAliases::new(source)))
        .collect(),
      default_category: config.default_category.clone(),
    }
  }

  /// Percentages are not computed here.
  pub fn apply(&self, raw: &Value) -> LoaderResult<Value> {
    let items = normalize_rows(raw);
    let mut rows = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
      let source = item
        .as_object()
        .ok_or_else(|| LoaderError::TransformError(format!("row {} is not an object", idx)))?;
      rows.push(Value::Object(self.transform_row(source)));
    }

    Ok(Value::Array(rows))
  }

  fn transform_row(&self, source: &Row) -> Row {
    let mut consumed: Vec<&str> = Vec::new();
    let mut row = Row::new();

    let category = match self.category.lookup(source) {
      Some((key, value)) if !is_blank(value) => {
        consumed.push(key);
        value.clone()
      }
      Some((key, _)) => {
        consumed.push(key);
        Value::String(self.default_category.clone())
      }
      None => Value::String(self.default_category.clone()),
    };
    row.insert(self.category_key.clone(), category);

    let count = match self.count.lookup(source) {
      Some((key, value)) => {
        consumed.push(key);
        as_number(value).map(number_value).unwrap_or(Value::from(0))
      }
      None => Value::from(0),
    };
    row.insert(self.count_key.clone(), count);

    for (target, aliases) in &self.mapped {
      if let Some((key, value)) = aliases.lookup(source) {
        consumed.push(key);
        row.insert(target.clone(), value.clone());
      }
    }

    for (key, value) in source {
      if !row.contains_key(key) && !consumed.contains(&key.as_str()) {
        row.insert(key.clone(), value.clone());
      }
    }

    row
  }
}

fn is_blank(value: &Value) -> bool {
  matches!(value, Value::String(s) if s.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn standard() -> StandardTransform {
    StandardTransform::new(&StandardConfig::default())
  }

  #[test]
  fn test_category_lookup_is_case_tolerant() {
    let transform = standard();
    for key in ["categoria", "Categoria", "CATEGORIA"] {
      let mut item = serde_json::Map::new();
      item.insert(key.to_string(), json!("Agua potable"));
      item.insert("casos".to_string(), json!(4));
      let out = transform.apply(&Value::Array(vec![Value::Object(item)])).unwrap();
      assert_eq!(out[0]["categoria"], json!("Agua potable"), "key {}", key);
      assert!(out[0].get(key).is_none() || key == "categoria");
    }
  }

  #[test]
  fn test_missing_fields_get_defaults() {
    let out = standard().apply(&json!([{"otro": "x"}])).unwrap();
    assert_eq!(out, json!([{"categoria": UNCATEGORIZED, "casos": 0, "otro": "x"}]));
  }

  #[test]
  fn test_count_from_numeric_string() {
    let out = standard().apply(&json!({"data": [{"categoria": "A", "CASOS": "12"}]})).unwrap();
    assert_eq!(out[0]["casos"], json!(12));
    assert!(out[0].get("CASOS").is_none());
  }

  #[test]
  fn test_blank_category_uses_default() {
    let out = standard().apply(&json!([{"categoria": "  ", "casos": 1}])).unwrap();
    assert_eq!(out[0]["categoria"], json!(UNCATEGORIZED));
  }

  #[test]
  fn test_custom_keys_and_field_map() {
    let mut field_map = BTreeMap::new();
    field_map.insert("codigo".to_string(), "ubigeo".to_string());
    let config = StandardConfig {
      category_field: "tipo".to_string(),
      count_field: "total".to_string(),
      category_key: Some("categoria".to_string()),
      count_key: Some("casos".to_string()),
      field_map,
      default_category: "Sin dato".to_string(),
    };
    let out = StandardTransform::new(&config)
      .apply(&json!([{"Tipo": "Red publica", "TOTAL": 9, "UBIGEO": "150101", "anio": 2017}]))
      .unwrap();
    assert_eq!(
      out,
      json!([{"categoria": "Red publica", "casos": 9, "codigo": "150101", "anio": 2017}])
    );
  }

  #[test]
  fn test_non_object_row_is_an_error() {
    let err = standard().apply(&json!([{"categoria": "A"}, "oops"])).unwrap_err();
    assert!(matches!(err, LoaderError::TransformError(_)));
  }

  #[test]
  fn test_config_deserializes_with_defaults() {
    let config: StandardConfig = serde_json::from_value(json!({"count_field": "total"})).unwrap();
    assert_eq!(config.category_field, "categoria");
    assert_eq!(config.count_field, "total");
    assert_eq!(config.default_category, UNCATEGORIZED);
  }
}
