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

//! Helpers for reading loosely shaped JSON payloads.

use gs_core::Row;
use serde_json::{Number, Value};

/// Object keys that may wrap the row array of a response.
pub const ARRAY_ALIASES: &[&str] = &["data", "items", "results", "rows", "resultados", "registros"];

/// Reshape any payload into a list of rows.
///
/// Arrays pass through, `{ data: [..] }` and the other [`ARRAY_ALIASES`]
/// unwrap, a lone object becomes a one-element list and anything else is
/// empty.
pub fn normalize_rows(raw: &Value) -> Vec<Value> {
  match raw {
    Value::Array(items) => items.clone(),
    Value::Object(object) => {
      for alias in ARRAY_ALIASES {
        if let Some(Value::Array(items)) = object.get(*alias) {
          return items.clone();
        }
      }
      vec![raw.clone()]
    }
    _ => Vec::new(),
  }
}

/// Numeric value of a JSON number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    _ => None,
  }
}

/// JSON number for `n`, integral values rendered without a fraction.
pub fn number_value(n: f64) -> Value {
  const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
  if n.fract() == 0.0 && n.abs() < MAX_EXACT {
    Value::from(n as i64)
  } else {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
  }
}

/// Text form of a scalar, used for group and merge keys.
pub fn display_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// `part / total` as a comma-decimal percentage with two places, e.g. `"12,50 %"`.
pub fn format_percentage(part: f64, total: f64) -> String {
  if total == 0.0 {
    return "0,00 %".to_string();
  }
  let pct = (part / total * 100.0 * 100.0).round() / 100.0;
  format!("{:.2} %", pct).replace('.', ",")
}

/// Spellings of one logical field name, fixed when a transform is built.
///
/// Covers the exact name, its capitalized, upper and lower case forms, then
/// falls back to a case-insensitive scan of the row's keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
  name: String,
  folded: String,
  spellings: Vec<String>,
}

impl FieldAliases {
  pub fn new(name: &str) -> Self {
    let mut spellings = Vec::with_capacity(4);
    for candidate in [name.to_string(), capitalize(name), name.to_uppercase(), name.to_lowercase()]
    {
      if !spellings.contains(&candidate) {
        spellings.push(candidate);
      }
    }
    Self { name: name.to_string(), folded: name.to_lowercase(), spellings }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn spellings(&self) -> &[String] {
    &self.spellings
  }

  /// First present, non-null spelling in `row`, with the key it was found under.
  pub fn lookup<'a>(&self, row: &'a Row) -> Option<(&'a str, &'a Value)> {
    self
      .spellings
      .iter()
      .filter_map(|key| row.get_key_value(key.as_str()))
      .find(|(_, value)| !value.is_null())
      .or_else(|| {
        row.iter().find(|(key, value)| !value.is_null() && key.to_lowercase() == self.folded)
      })
      .map(|(key, value)| (key.as_str(), value))
  }

  pub fn value<'a>(&self, row: &'a Row) -> Option<&'a Value> {
    self.lookup(row).map(|(_, value)| value)
  }
}

fn capitalize(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}
