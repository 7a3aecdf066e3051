//! # gs-core
//!
//! Core types and traits shared by the geostat crates: the [`Gateway`] and
//! [`ResponseCache`] seams, request parameter types and configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use traits::{CacheEntry, Gateway, ResponseCache};
pub use types::{Codes, HttpMethod, ParamKind, RequestParams, Row, BATCH_PARAM};

/// Failed attempts allowed per request key before calls are suppressed
pub const MAX_RETRIES: u32 = 3;

/// Response cache TTL (7 days)
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 168;

/// Grace period before a finished in-flight request is forgotten
pub const DEFAULT_INFLIGHT_GRACE_MS: u64 = 500;

/// Requests per minute
pub const DEFAULT_RATE_LIMIT: u32 = 120;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
