use thiserror::Error;

/// The main error type for gs-* crates
#[derive(Error, Debug)]
pub enum Error {
  /// Environment variable error
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// Serialization/Deserialization error
  #[error("Serialization error: {0}")]
  Serde(#[from] serde_json::Error),

  /// Request rate limit exceeded
  #[error("Rate limit exceeded: {0}")]
  RateLimit(String),

  /// Endpoint id not present in the gateway catalog
  #[error("Unknown endpoint: {0}")]
  UnknownEndpoint(String),

  /// HTTP transport error
  #[error("HTTP error: {0}")]
  Http(String),

  /// Error envelope returned by the statistics API
  #[error("API error: {0}")]
  Api(String),

  /// Parse error for response bodies
  #[error("Parse error: {0}")]
  Parse(String),

  /// Response cache failure
  #[error("Cache error: {0}")]
  Cache(String),

  /// General unexpected error
  #[error("Unexpected error: {0}")]
  Unexpected(String),
}

/// Result type alias for gs-* crates
pub type Result<T> = std::result::Result<T, Error>;
