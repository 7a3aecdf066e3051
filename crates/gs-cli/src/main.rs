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

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{load::LoadArgs, sections::SectionsArgs};

mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "geostat")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Load one section for one or more location codes and print it as JSON
  Load(LoadArgs),

  /// List the sections and fields of a registry
  Sections(SectionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
  // Load environment variables
  dotenv().ok();

  // Parse CLI arguments
  let cli = Cli::parse();

  // Initialize logging, keeping stdout for results
  let log_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

  // Execute command
  match cli.command {
    Commands::Load(args) => {
      let config = config::Config::from_env()?;
      commands::load::execute(args, config).await?
    }
    Commands::Sections(args) => commands::sections::execute(args)?,
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_load_command() {
    let cli = Cli::try_parse_from([
      "geostat",
      "load",
      "--registry",
      "config/sections.json",
      "--section",
      "demografia",
      "--codes",
      "150101,150102",
      "--force-refresh",
    ])
    .unwrap();

    let Commands::Load(args) = cli.command else {
      panic!("expected load command");
    };
    assert_eq!(args.section, "demografia");
    assert_eq!(args.codes, vec!["150101", "150102"]);
    assert!(args.force_refresh);
    assert!(!args.compact);
  }

  #[test]
  fn test_load_requires_codes() {
    let result = Cli::try_parse_from([
      "geostat",
      "load",
      "--registry",
      "config/sections.json",
      "--section",
      "demografia",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn test_verbose_is_global() {
    let cli =
      Cli::try_parse_from(["geostat", "sections", "--registry", "config/sections.json", "-v"])
        .unwrap();
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Sections(_)));
  }
}
