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

//! Aggregate transform: group rows, sum numeric fields, add percentages.

use gs_core::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{LoaderError, LoaderResult};
use crate::values::{
  as_number, display_string, format_percentage, normalize_rows, number_value, FieldAliases,
};

fn default_separator() -> String {
  "|".to_string()
}

fn default_percentage_key() -> String {
  "porcentaje".to_string()
}

/// Declarative options for the aggregate transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateConfig {
  /// Fields whose values form the group key
  pub group_by: Vec<String>,

  /// Fields summed per group; the first one drives percentages and ordering
  pub sum_fields: Vec<String>,

  #[serde(default = "default_separator")]
  pub separator: String,

  #[serde(default = "default_percentage_key")]
  pub percentage_key: String,
}

#[derive(Debug, Clone)]
pub struct AggregateTransform {
  group_by: Vec<FieldAliases>,
  sum_fields: Vec<FieldAliases>,
  separator: String,
  percentage_key: String,
}

struct Group {
  labels: Vec<Value>,
  sums: Vec<f64>,
}

impl AggregateTransform {
  pub fn new(config: &AggregateConfig) -> LoaderResult<Self> {
    if config.sum_fields.is_empty() {
      return Err(LoaderError::ConfigurationError(
        "aggregate transform needs at least one sum field".to_string(),
      ));
    }
    Ok(Self {
      group_by: config.group_by.iter().map(|f| FieldAliases::new(f)).collect(),
      sum_fields: config.sum_fields.iter().map(|f| FieldAliases::new(f)).collect(),
      separator: config.separator.clone(),
      percentage_key: config.percentage_key.clone(),
    })
  }

  pub fn apply(&self, raw: &Value) -> LoaderResult<Value> {
    let items = normalize_rows(raw);
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (idx, item) in items.iter().enumerate() {
      let row = item
        .as_object()
        .ok_or_else(|| LoaderError::TransformError(format!("row {} is not an object", idx)))?;

      let key = self.group_key(row);
      let slot = *index.entry(key).or_insert_with(|| {
        groups.push(Group {
          labels: self
            .group_by
            .iter()
            .map(|field| field.value(row).cloned().unwrap_or(Value::Null))
            .collect(),
          sums: vec![0.0; self.sum_fields.len()],
        });
        groups.len() - 1
      });

      for (sum, field) in groups[slot].sums.iter_mut().zip(&self.sum_fields) {
        *sum += field.value(row).and_then(as_number).unwrap_or(0.0);
      }
    }

    let total: f64 = groups.iter().map(|g| g.sums[0]).sum();
    groups.sort_by(|a, b| b.sums[0].partial_cmp(&a.sums[0]).unwrap_or(std::cmp::Ordering::Equal));

    let rows = groups
      .into_iter()
      .map(|group| {
        let mut out = Row::new();
        for (field, label) in self.group_by.iter().zip(group.labels) {
          out.insert(field.name().to_string(), label);
        }
        for (field, sum) in self.sum_fields.iter().zip(&group.sums) {
          out.insert(field.name().to_string(), number_value(*sum));
        }
        out.insert(self.percentage_key.clone(), Value::String(format_percentage(group.sums[0], total)));
        Value::Object(out)
      })
      .collect();

    Ok(Value::Array(rows))
  }

  fn group_key(&self, row: &Row) -> String {
    self
      .group_by
      .iter()
      .map(|field| {
        field.value(row).map(display_string).unwrap_or_default().trim().to_lowercase()
      })
      .collect::<Vec<_>>()
      .join(&self.separator)
  }
}
