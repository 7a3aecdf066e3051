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

//! Merge strategies for per-code results of aggregatable fields.
//!
//! A strategy is picked by the first [`AggregationRule`] matching the
//! `(section, endpoint)` pair; anything unmatched merges by key.

use gs_core::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::values::{as_number, display_string, normalize_rows, number_value};

/// Attribute sets that identify a row when merging by key, in priority order.
pub const DISCRIMINATORS: &[&[&str]] = &[
  &["tipo_seguro"],
  &["categoria", "tipo_material"],
  &["categoria", "tipo_servicio"],
  &["actividad"],
  &["idioma"],
  &["lengua_materna"],
  &["religion"],
  &["necesidad"],
  &["deficiencia"],
  &["sexo"],
  &["nivel_educativo"],
  &["indicador"],
  &["categoria"],
];

/// Key shared by rows matching no discriminator.
pub const FALLBACK_KEY: &str = "__total__";

pub mod defaults {
  pub const DEMOGRAPHY_SECTION: &str = "demografia";
  pub const POPULATION_BY_SEX: &str = "poblacion_sexo";
  pub const POPULATED_CENTERS: &str = "centros_poblados";
  pub const POPULATION_FIELDS: &[&str] = &["hombres", "mujeres", "poblacion_total"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationStrategy {
  /// Sum the named fields over every code into one record
  SumFields { fields: Vec<String> },
  /// Concatenate per-code lists in call order
  Flatten,
  /// Sum numeric fields of rows sharing a discriminator key
  MergeByKey,
}

impl AggregationStrategy {
  /// Merge raw per-code payloads, given in call order.
  pub fn merge(&self, per_code: &[Value]) -> Value {
    match self {
      AggregationStrategy::SumFields { fields } => sum_fields(per_code, fields),
      AggregationStrategy::Flatten => flatten(per_code),
      AggregationStrategy::MergeByKey => merge_by_key(per_code),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRule {
  /// Section the rule is limited to, any section when absent
  #[serde(default)]
  pub section: Option<String>,
  pub endpoint: String,
  pub strategy: AggregationStrategy,
}

impl AggregationRule {
  pub fn matches(&self, section: &str, endpoint: &str) -> bool {
    self.endpoint == endpoint && self.section.as_deref().is_none_or(|s| s == section)
  }
}

static DEFAULT_STRATEGY: AggregationStrategy = AggregationStrategy::MergeByKey;

/// Ordered rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRules {
  rules: Vec<AggregationRule>,
}

impl Default for AggregationRules {
  fn default() -> Self {
    Self {
      rules: vec![
        AggregationRule {
          section: Some(defaults::DEMOGRAPHY_SECTION.to_string()),
          endpoint: defaults::POPULATION_BY_SEX.to_string(),
          strategy: AggregationStrategy::SumFields {
            fields: defaults::POPULATION_FIELDS.iter().map(|f| f.to_string()).collect(),
          },
        },
        AggregationRule {
          section: None,
          endpoint: defaults::POPULATED_CENTERS.to_string(),
          strategy: AggregationStrategy::Flatten,
        },
      ],
    }
  }
}

impl AggregationRules {
  pub fn empty() -> Self {
    Self { rules: Vec::new() }
  }

  /// Builder: put `rules` ahead of the existing ones.
  pub fn with_rules_first(mut self, rules: Vec<AggregationRule>) -> Self {
    let mut merged = rules;
    merged.append(&mut self.rules);
    self.rules = merged;
    self
  }

  pub fn rules(&self) -> &[AggregationRule] {
    &self.rules
  }

  pub fn select(&self, section: &str, endpoint: &str) -> &AggregationStrategy {
    self
      .rules
      .iter()
      .find(|rule| rule.matches(section, endpoint))
      .map_or(&DEFAULT_STRATEGY, |rule| &rule.strategy)
  }
}

/// One synthetic record with `fields` summed over all codes.
///
/// Codes whose values are all zero are left out; when none is left the result
/// is empty.
pub fn sum_fields(per_code: &[Value], fields: &[String]) -> Value {
  let mut totals = vec![0.0; fields.len()];
  let mut contributors = 0;

  for raw in per_code {
    let mut sums = vec![0.0; fields.len()];
    for item in normalize_rows(raw) {
      let Some(row) = item.as_object() else { continue };
      for (sum, field) in sums.iter_mut().zip(fields) {
        *sum += row.get(field).and_then(as_number).unwrap_or(0.0);
      }
    }

    if sums.iter().all(|v| *v == 0.0) {
      continue;
    }
    contributors += 1;
    for (total, sum) in totals.iter_mut().zip(sums) {
      *total += sum;
    }
  }

  if contributors == 0 {
    debug!("No code contributed to {:?}", fields);
    return Value::Array(Vec::new());
  }

  let record: Row =
    fields.iter().cloned().zip(totals.into_iter().map(number_value)).collect();
  Value::Array(vec![Value::Object(record)])
}

/// All per-code rows concatenated in call order.
pub fn flatten(per_code: &[Value]) -> Value {
  Value::Array(per_code.iter().flat_map(normalize_rows).collect())
}

/// Rows sharing a discriminator key collapse into the first one seen, with
/// their numeric fields summed. Output keeps first-seen order.
pub fn merge_by_key(per_code: &[Value]) -> Value {
  let mut merged: Vec<Row> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for raw in per_code {
    for item in normalize_rows(raw) {
      let Value::Object(row) = item else { continue };
      let (key, discriminator) = discriminator_key(&row);

      match index.get(&key).copied() {
        Some(slot) => add_numeric_fields(&mut merged[slot], &row, discriminator),
        None => {
          index.insert(key, merged.len());
          merged.push(row);
        }
      }
    }
  }

  Value::Array(merged.into_iter().map(Value::Object).collect())
}

fn discriminator_key(row: &Row) -> (String, &'static [&'static str]) {
  for &fields in DISCRIMINATORS {
    let present = fields.iter().all(|f| row.get(*f).is_some_and(|v| !v.is_null()));
    if present {
      let key = fields
        .iter()
        .map(|f| format!("{}={}", f, row.get(*f).map(display_string).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("|");
      return (key, fields);
    }
  }
  (FALLBACK_KEY.to_string(), &[])
}

fn add_numeric_fields(target: &mut Row, source: &Row, discriminator: &[&str]) {
  for (key, value) in source {
    if discriminator.contains(&key.as_str()) {
      continue;
    }
    let Some(addend) = value.as_f64() else { continue };
    match target.get(key) {
      Some(Value::Number(current)) => {
        let sum = current.as_f64().unwrap_or(0.0) + addend;
        target.insert(key.clone(), number_value(sum));
      }
      None | Some(Value::Null) => {
        target.insert(key.clone(), value.clone());
      }
      Some(_) => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_sum_fields_population() {
    let per_code = vec![
      json!({"hombres": 2, "mujeres": 3, "poblacion_total": 5}),
      json!({"hombres": 1, "mujeres": 1, "poblacion_total": 2}),
    ];
    let fields: Vec<String> = defaults::POPULATION_FIELDS.iter().map(|f| f.to_string()).collect();
    assert_eq!(
      sum_fields(&per_code, &fields),
      json!([{"hombres": 3, "mujeres": 4, "poblacion_total": 7}])
    );
  }

  #[test]
  fn test_sum_fields_all_zero_is_empty() {
    let per_code = vec![
      json!({"hombres": 0, "mujeres": 0, "poblacion_total": 0}),
      json!([{"hombres": "0", "mujeres": 0, "poblacion_total": 0}]),
      json!([]),
    ];
    let fields = vec!["hombres".to_string(), "mujeres".to_string()];
    assert_eq!(sum_fields(&per_code, &fields), json!([]));
  }

  #[test]
  fn test_sum_fields_accepts_wrapped_and_string_values() {
    let per_code = vec![json!({"data": [{"hombres": "4"}, {"hombres": 1}]}), json!({"hombres": 0})];
    let fields = vec!["hombres".to_string()];
    assert_eq!(sum_fields(&per_code, &fields), json!([{"hombres": 5}]));
  }

  #[test]
  fn test_flatten_keeps_call_order() {
    let per_code = vec![json!([{"id": "A1"}]), json!([{"id": "B1"}, {"id": "B2"}])];
    assert_eq!(flatten(&per_code), json!([{"id": "A1"}, {"id": "B1"}, {"id": "B2"}]));
  }

  #[test]
  fn test_merge_by_key_sums_matching_rows() {
    let per_code = vec![
      json!([{"categoria": "X", "casos": 2}]),
      json!([{"categoria": "Y", "casos": 1}, {"categoria": "X", "casos": 3}]),
    ];
    assert_eq!(
      merge_by_key(&per_code),
      json!([{"categoria": "X", "casos": 5}, {"categoria": "Y", "casos": 1}])
    );
  }

  #[test]
  fn test_merge_by_key_priority_and_fallback() {
    let per_code = vec![
      json!([
        {"categoria": "Techo", "tipo_material": "Calamina", "casos": 1},
        {"categoria": "Techo", "tipo_material": "Teja", "casos": 2},
        {"total": 10}
      ]),
      json!([
        {"categoria": "Techo", "tipo_material": "Calamina", "casos": 4},
        {"total": 5}
      ]),
    ];
    assert_eq!(
      merge_by_key(&per_code),
      json!([
        {"categoria": "Techo", "tipo_material": "Calamina", "casos": 5},
        {"categoria": "Techo", "tipo_material": "Teja", "casos": 2},
        {"total": 15}
      ])
    );
  }

  #[test]
  fn test_merge_by_key_does_not_sum_numeric_discriminator() {
    let per_code = vec![json!([{"sexo": 1, "casos": 2}]), json!([{"sexo": 1, "casos": 2}])];
    assert_eq!(merge_by_key(&per_code), json!([{"sexo": 1, "casos": 4}]));
  }

  #[test]
  fn test_merge_by_key_leaves_text_fields_from_first_row() {
    let per_code = vec![
      json!([{"religion": "Catolica", "fuente": "A", "casos": 1.5}]),
      json!([{"religion": "Catolica", "fuente": "B", "casos": 1}]),
    ];
    assert_eq!(
      merge_by_key(&per_code),
      json!([{"religion": "Catolica", "fuente": "A", "casos": 2.5}])
    );
  }

  #[test]
  fn test_rule_selection() {
    let rules = AggregationRules::default();
    assert!(matches!(
      rules.select("demografia", "poblacion_sexo"),
      AggregationStrategy::SumFields { .. }
    ));
    assert_eq!(rules.select("otra", "poblacion_sexo"), &AggregationStrategy::MergeByKey);
    assert_eq!(rules.select("cualquiera", "centros_poblados"), &AggregationStrategy::Flatten);
    assert_eq!(rules.select("salud", "seguro_salud"), &AggregationStrategy::MergeByKey);
  }

  #[test]
  fn test_rules_first_take_priority() {
    let rules = AggregationRules::default().with_rules_first(vec![AggregationRule {
      section: None,
      endpoint: "centros_poblados".to_string(),
      strategy: AggregationStrategy::MergeByKey,
    }]);
    assert_eq!(rules.select("x", "centros_poblados"), &AggregationStrategy::MergeByKey);
    assert_eq!(rules.rules().len(), 3);
  }

  #[test]
  fn test_rule_deserialize() {
    let rule: AggregationRule = serde_json::from_value(json!({
      "endpoint": "poblacion_edad",
      "strategy": {"kind": "sum_fields", "fields": ["total"]}
    }))
    .unwrap();
    assert!(rule.matches("any", "poblacion_edad"));
    assert_eq!(rule.strategy, AggregationStrategy::SumFields { fields: vec!["total".to_string()] });
  }
}
