//! Endpoint catalog: maps endpoint ids used in section metadata to API paths

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Endpoint ids served by the statistics API out of the box.
pub const DEFAULT_ENDPOINTS: &[(&str, &str)] = &[
  ("poblacion_sexo", "demografia/poblacion-sexo"),
  ("poblacion_edad", "demografia/poblacion-edad"),
  ("centros_poblados", "territorio/centros-poblados"),
  ("seguro_salud", "salud/seguro"),
  ("discapacidad", "salud/discapacidad"),
  ("nivel_educativo", "educacion/nivel-educativo"),
  ("material_vivienda", "vivienda/material"),
  ("servicios_basicos", "vivienda/servicios"),
  ("necesidades_basicas", "vivienda/necesidades-basicas"),
  ("actividad_economica", "economia/actividad"),
  ("idioma", "cultura/idioma"),
  ("lengua_materna", "cultura/lengua-materna"),
  ("religion", "cultura/religion"),
  ("indicadores", "indicadores/resumen"),
];

/// Lookup table from endpoint id to URL path relative to the base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointCatalog {
  paths: HashMap<String, String>,
}

impl EndpointCatalog {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Catalog populated with [`DEFAULT_ENDPOINTS`].
  pub fn with_defaults() -> Self {
    let paths =
      DEFAULT_ENDPOINTS.iter().map(|(id, path)| (id.to_string(), path.to_string())).collect();
    Self { paths }
  }

  /// Builder: add or replace one endpoint.
  pub fn with_endpoint(mut self, id: impl Into<String>, path: impl Into<String>) -> Self {
    self.insert(id, path);
    self
  }

  pub fn insert(&mut self, id: impl Into<String>, path: impl Into<String>) {
    self.paths.insert(id.into(), path.into());
  }

  /// Merge another catalog in, its entries winning.
  pub fn extend(&mut self, other: EndpointCatalog) {
    self.paths.extend(other.paths);
  }

  pub fn path(&self, id: &str) -> Option<&str> {
    self.paths.get(id).map(String::as_str)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.paths.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }
}
