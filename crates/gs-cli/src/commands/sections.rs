use anyhow::Result;
use clap::Args;
use gs_loaders::SectionRegistry;
use std::fmt::Write;
use std::path::PathBuf;

use crate::commands::read_registry;

#[derive(Args, Debug)]
pub struct SectionsArgs {
  /// Section registry file (JSON)
  #[arg(short, long, env = "GEOSTAT_REGISTRY")]
  pub registry: PathBuf,
}

pub fn execute(args: SectionsArgs) -> Result<()> {
  let registry = read_registry(&args.registry)?;
  print!("{}", render(&registry));
  Ok(())
}

fn render(registry: &SectionRegistry) -> String {
  let mut out = String::new();
  for (key, section) in &registry.sections {
    match &section.title {
      Some(title) => {
        let _ = writeln!(out, "📊 {} ({})", key, title);
      }
      None => {
        let _ = writeln!(out, "📊 {}", key);
      }
    }
    for field in &section.fields {
      let _ = writeln!(
        out,
        "   {:<24} {:<4} {:<24} {:<12}{}",
        field.name,
        field.method.to_string(),
        field.endpoint,
        field.transform.kind(),
        if field.aggregatable { " aggregatable" } else { "" }
      );
    }
  }
  if !registry.aggregation.is_empty() {
    let _ = writeln!(out, "🔀 {} aggregation rules", registry.aggregation.len());
  }
  out
}
