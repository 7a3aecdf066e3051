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

//! Section registry and field-mapping resolution.
//!
//! A registry is a JSON document:
//!
//! ```json
//! {
//!   "sections": {
//!     "demografia": {
//!       "title": "Población",
//!       "fields": [
//!         { "name": "poblacion", "endpoint": "poblacion_sexo", "aggregatable": true,
//!           "transform": { "type": "custom", "strategy": "sex_distribution" } }
//!       ]
//!     }
//!   },
//!   "aggregation": [],
//!   "endpoints": { "poblacion_sexo": "demografia/poblacion-sexo" }
//! }
//! ```

use dashmap::DashMap;
use gs_core::{HttpMethod, ParamKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::aggregation::AggregationRule;
use crate::error::{LoaderError, LoaderResult};
use crate::transform::{Transform, TransformFactory, TransformSpec};

/// Declarative description of one field of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
  pub name: String,
  pub endpoint: String,
  #[serde(default)]
  pub method: HttpMethod,
  #[serde(default)]
  pub param_kind: ParamKind,
  #[serde(default)]
  pub aggregatable: bool,
  #[serde(default)]
  pub transform: TransformSpec,
  /// Table layout hints for the report; not used by the loader
  #[serde(default)]
  pub columns: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionMetadata {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub fields: Vec<FieldMetadata>,
}

/// The external metadata every section is resolved from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionRegistry {
  #[serde(default)]
  pub sections: BTreeMap<String, SectionMetadata>,
  /// Rules evaluated ahead of the built-in aggregation rules
  #[serde(default)]
  pub aggregation: Vec<AggregationRule>,
  /// Endpoint id to URL path, merged into the gateway catalog
  #[serde(default)]
  pub endpoints: BTreeMap<String, String>,
}

impl SectionRegistry {
  pub fn from_json_str(text: &str) -> LoaderResult<Self> {
    serde_json::from_str(text)
      .map_err(|e| LoaderError::RegistryError(format!("Invalid section registry: {}", e)))
  }

  pub fn from_path(path: impl AsRef<Path>) -> LoaderResult<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|e| LoaderError::IoError(format!("{}: {}", path.display(), e)))?;
    Self::from_json_str(&text)
  }

  /// Builder: add or replace a section
  pub fn with_section(mut self, key: impl Into<String>, section: SectionMetadata) -> Self {
    self.sections.insert(key.into(), section);
    self
  }

  pub fn section(&self, key: &str) -> Option<&SectionMetadata> {
    self.sections.get(key)
  }

  pub fn section_keys(&self) -> impl Iterator<Item = &str> {
    self.sections.keys().map(String::as_str)
  }
}

/// A field ready to load: its request shape and compiled transform.
#[derive(Debug, Clone)]
pub struct FieldMapping {
  pub field_name: String,
  pub endpoint: String,
  pub method: HttpMethod,
  pub param_kind: ParamKind,
  pub aggregatable: bool,
  pub transform: Transform,
}

/// Resolved fields of one section, in registry order.
#[derive(Debug, Clone, Default)]
pub struct SectionConfig {
  pub key: String,
  fields: Vec<FieldMapping>,
}

impl SectionConfig {
  pub fn new(key: impl Into<String>, fields: Vec<FieldMapping>) -> Self {
    Self { key: key.into(), fields }
  }

  pub fn field(&self, name: &str) -> Option<&FieldMapping> {
    self.fields.iter().find(|f| f.field_name == name)
  }

  pub fn fields(&self) -> &[FieldMapping] {
    &self.fields
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

/// Resolves section keys into [`SectionConfig`]s, memoized per key.
pub struct FieldMappingResolver {
  registry: Arc<SectionRegistry>,
  factory: TransformFactory,
  resolved: DashMap<String, Arc<SectionConfig>>,
}

impl FieldMappingResolver {
  pub fn new(registry: SectionRegistry, factory: TransformFactory) -> Self {
    Self { registry: Arc::new(registry), factory, resolved: DashMap::new() }
  }

  pub fn registry(&self) -> &SectionRegistry {
    &self.registry
  }

  /// `None` for an unknown or empty section key.
  ///
  /// Fields with an empty name or a transform that cannot be built are left
  /// out of the config.
  pub fn resolve(&self, section: &str) -> Option<Arc<SectionConfig>> {
    if section.is_empty() {
      return None;
    }
    if let Some(config) = self.resolved.get(section) {
      return Some(Arc::clone(config.value()));
    }

    let metadata = self.registry.section(section)?;
    let fields = metadata
      .fields
      .iter()
      .filter(|field| !field.name.is_empty())
      .filter_map(|field| match self.build_mapping(field) {
        Ok(mapping) => Some(mapping),
        Err(e) => {
          warn!("Skipping field {}.{}: {}", section, field.name, e);
          None
        }
      })
      .collect();

    let config = Arc::new(SectionConfig::new(section, fields));
    debug!("Resolved section {} with {} fields", section, config.len());
    self.resolved.insert(section.to_string(), Arc::clone(&config));
    Some(config)
  }

  pub fn field_mapping(&self, section: &str, field: &str) -> Option<FieldMapping> {
    self.resolve(section)?.field(field).cloned()
  }

  fn build_mapping(&self, field: &FieldMetadata) -> LoaderResult<FieldMapping> {
    Ok(FieldMapping {
      field_name: field.name.clone(),
      endpoint: field.endpoint.clone(),
      method: field.method,
      param_kind: field.param_kind,
      aggregatable: field.aggregatable,
      transform: self.factory.create_transform(&field.transform)?,
    })
  }
}

impl std::fmt::Debug for FieldMappingResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FieldMappingResolver")
      .field("sections", &self.registry.sections.len())
      .field("resolved", &self.resolved.len())
      .finish()
  }
}
