use anyhow::{Context, Result};
use gs_core::Config as CoreConfig;
use gs_loaders::{CacheConfig, LoaderConfig};

#[derive(Debug, Clone)]
pub struct Config {
  pub api_config: CoreConfig,
  pub loader_config: LoaderConfig,
  pub cache_config: CacheConfig,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let api_config = CoreConfig::from_env().context("Failed to load GEOSTAT_* configuration")?;
    Ok(Self::from_core(api_config))
  }

  pub fn from_core(api_config: CoreConfig) -> Self {
    let loader_config = LoaderConfig::from_core(&api_config);
    let cache_config = CacheConfig::from_core(&api_config);
    Self { api_config, loader_config, cache_config }
  }
}
