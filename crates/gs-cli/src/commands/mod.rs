pub mod load;
pub mod sections;

use anyhow::{Context, Result};
use gs_loaders::SectionRegistry;
use std::path::Path;

pub(crate) fn read_registry(path: &Path) -> Result<SectionRegistry> {
  SectionRegistry::from_path(path)
    .with_context(|| format!("Failed to read section registry {}", path.display()))
}
