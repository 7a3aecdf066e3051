//! Configuration management for the geostat gateway and loaders

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Main configuration struct for geostat clients and loaders
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Base URL of the statistics API
  pub base_url: String,

  /// Optional bearer token
  pub api_key: Option<String>,

  /// Request timeout in seconds
  pub timeout_secs: u64,

  /// Request rate limit (requests per minute)
  pub rate_limit: u32,

  /// Transport-level retries for a single call
  pub max_retries: u32,

  /// Response cache TTL in hours
  pub cache_ttl_hours: i64,

  /// How long a finished in-flight request stays joinable, in milliseconds
  pub inflight_grace_ms: u64,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let base_url = env::var("GEOSTAT_BASE_URL")
      .map_err(|_| Error::Config("GEOSTAT_BASE_URL not set".to_string()))?;
    url::Url::parse(&base_url)
      .map_err(|e| Error::Config(format!("Invalid GEOSTAT_BASE_URL: {}", e)))?;

    let api_key = env::var("GEOSTAT_API_KEY").ok().filter(|k| !k.trim().is_empty());

    Ok(Config {
      base_url,
      api_key,
      timeout_secs: parse_var("GEOSTAT_TIMEOUT_SECS", crate::DEFAULT_TIMEOUT_SECS)?,
      rate_limit: parse_var("GEOSTAT_RATE_LIMIT", crate::DEFAULT_RATE_LIMIT)?,
      max_retries: parse_var("GEOSTAT_MAX_RETRIES", 0)?,
      cache_ttl_hours: parse_var("GEOSTAT_CACHE_TTL_HOURS", crate::DEFAULT_CACHE_TTL_HOURS)?,
      inflight_grace_ms: parse_var("GEOSTAT_INFLIGHT_GRACE_MS", crate::DEFAULT_INFLIGHT_GRACE_MS)?,
    })
  }

  /// Create a config with default values (for testing)
  pub fn default_with_base_url(base_url: impl Into<String>) -> Self {
    Config {
      base_url: base_url.into(),
      api_key: None,
      timeout_secs: crate::DEFAULT_TIMEOUT_SECS,
      rate_limit: crate::DEFAULT_RATE_LIMIT,
      max_retries: 0,
      cache_ttl_hours: crate::DEFAULT_CACHE_TTL_HOURS,
      inflight_grace_ms: crate::DEFAULT_INFLIGHT_GRACE_MS,
    }
  }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
  match env::var(name) {
    Ok(raw) => raw.trim().parse().map_err(|_| Error::Config(format!("Invalid {}", name))),
    Err(_) => Ok(default),
  }
}
