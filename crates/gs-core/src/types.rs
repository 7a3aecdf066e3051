//! Request-side types shared by gateways, caches and loaders

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A flat, table-ready record produced by a transform.
pub type Row = Map<String, Value>;

/// Query parameter name used for batched code lists.
pub const BATCH_PARAM: &str = "codigos";

/// HTTP verb a field is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  #[serde(alias = "get")]
  Get,
  #[serde(alias = "post")]
  Post,
}

impl fmt::Display for HttpMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HttpMethod::Get => write!(f, "GET"),
      HttpMethod::Post => write!(f, "POST"),
    }
  }
}

/// Which request parameter a location code is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
  #[default]
  #[serde(alias = "ubigeo")]
  LocationCode,
  #[serde(alias = "centro_poblado")]
  PopulatedCenter,
  #[serde(alias = "distrito")]
  District,
  #[serde(alias = "provincia")]
  Province,
  #[serde(alias = "departamento")]
  Department,
  #[serde(alias = "codigos")]
  CodeList,
}

impl ParamKind {
  /// Name of the query parameter on the wire.
  pub fn wire_name(&self) -> &'static str {
    match self {
      ParamKind::LocationCode => "ubigeo",
      ParamKind::PopulatedCenter => "codigo_centro_poblado",
      ParamKind::District => "distrito",
      ParamKind::Province => "provincia",
      ParamKind::Department => "departamento",
      ParamKind::CodeList => BATCH_PARAM,
    }
  }
}

impl fmt::Display for ParamKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.wire_name())
  }
}

/// One location code or a list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codes {
  Single(String),
  Many(Vec<String>),
}

impl Codes {
  pub fn as_slice(&self) -> &[String] {
    match self {
      Codes::Single(code) => std::slice::from_ref(code),
      Codes::Many(codes) => codes,
    }
  }

  pub fn first(&self) -> Option<&str> {
    self.as_slice().first().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.as_slice().len()
  }

  pub fn is_empty(&self) -> bool {
    self.as_slice().is_empty()
  }

  /// True when more than one code was supplied.
  pub fn is_multiple(&self) -> bool {
    self.len() > 1
  }
}

impl From<&str> for Codes {
  fn from(code: &str) -> Self {
    Codes::Single(code.to_string())
  }
}

impl From<String> for Codes {
  fn from(code: String) -> Self {
    Codes::Single(code)
  }
}

impl From<Vec<String>> for Codes {
  fn from(codes: Vec<String>) -> Self {
    Codes::Many(codes)
  }
}

impl From<Vec<&str>> for Codes {
  fn from(codes: Vec<&str>) -> Self {
    Codes::Many(codes.into_iter().map(str::to_string).collect())
  }
}

impl From<&[&str]> for Codes {
  fn from(codes: &[&str]) -> Self {
    Codes::Many(codes.iter().map(|c| c.to_string()).collect())
  }
}

/// Parameters of a single gateway call.
///
/// Backed by a sorted map so the serialized form, and every key derived
/// from it, does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestParams(BTreeMap<String, Value>);

impl RequestParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// `{<kind wire name>: code}`
  pub fn single(kind: ParamKind, code: &str) -> Self {
    let mut params = BTreeMap::new();
    params.insert(kind.wire_name().to_string(), Value::String(code.to_string()));
    Self(params)
  }

  /// `{"codigos": [..]}`, codes kept in caller order.
  pub fn batch(codes: &[String]) -> Self {
    let list = codes.iter().cloned().map(Value::String).collect();
    let mut params = BTreeMap::new();
    params.insert(BATCH_PARAM.to_string(), Value::Array(list));
    Self(params)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Stable JSON rendering used for cache and request keys.
  pub fn canonical(&self) -> String {
    let mut out = String::from("{");
    for (idx, (key, value)) in self.0.iter().enumerate() {
      if idx > 0 {
        out.push(',');
      }
      out.push_str(&Value::String(key.clone()).to_string());
      out.push(':');
      out.push_str(&value.to_string());
    }
    out.push('}');
    out
  }
}
