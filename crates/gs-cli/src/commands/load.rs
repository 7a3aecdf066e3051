use anyhow::{bail, Result};
use clap::Args;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use gs_client::{EndpointCatalog, GeoStatClient};
use gs_loaders::{
  CacheHelper, FieldMappingResolver, SectionDataLoader, SectionRegistry, TransformFactory,
};

use crate::commands::read_registry;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoadArgs {
  /// Section registry file (JSON)
  #[arg(short, long, env = "GEOSTAT_REGISTRY")]
  pub registry: PathBuf,

  /// Section key to load
  #[arg(short, long)]
  pub section: String,

  /// Location codes, comma separated
  #[arg(short, long, value_delimiter = ',', required = true)]
  pub codes: Vec<String>,

  /// Skip cached responses
  #[arg(long)]
  pub force_refresh: bool,

  /// Print single-line JSON
  #[arg(long)]
  pub compact: bool,
}

pub async fn execute(args: LoadArgs, config: Config) -> Result<()> {
  let registry = read_registry(&args.registry)?;
  if registry.section(&args.section).is_none() {
    bail!("Unknown section: {}", args.section);
  }

  let client = GeoStatClient::new(config.api_config.clone())?
    .with_endpoints(endpoint_catalog(&registry));

  let resolver = FieldMappingResolver::new(registry, TransformFactory::default());
  let loader = SectionDataLoader::new(
    Arc::new(client),
    resolver,
    CacheHelper::in_memory(config.cache_config.clone()),
  )
  .with_config(config.loader_config.clone());

  info!("Loading section {} for {} codes", args.section, args.codes.len());
  let values = loader.load_section_data(&args.section, args.codes, args.force_refresh).await;

  println!("{}", render(&values, args.compact)?);
  Ok(())
}

/// Built-in endpoints plus the ones the registry declares.
fn endpoint_catalog(registry: &SectionRegistry) -> EndpointCatalog {
  let mut catalog = EndpointCatalog::with_defaults();
  for (id, path) in &registry.endpoints {
    catalog.insert(id.clone(), path.clone());
  }
  catalog
}

fn render(values: &Map<String, Value>, compact: bool) -> Result<String> {
  let text =
    if compact { serde_json::to_string(values)? } else { serde_json::to_string_pretty(values)? };
  Ok(text)
}
