//! # gs-client
//!
//! HTTP gateway for the geostat statistics API.
//!
//! [`GeoStatClient`] implements [`gs_core::Gateway`]: single-code lookups go
//! out as `GET <path>?<param>=<code>`, batched lookups as `POST <path>` with
//! `{"codigos": [...]}` in the body.
//!
//! ```ignore
//! use gs_client::GeoStatClient;
//! use gs_core::{Config, Gateway, ParamKind};
//!
//! let client = GeoStatClient::new(Config::from_env()?)?;
//! let rows = client.fetch("seguro_salud", ParamKind::LocationCode, "150101").await?;
//! ```
//!
//! ## Rate Limiting
//!
//! Every call waits on a direct governor rate limiter sized from
//! `Config::rate_limit` (requests per minute).

#![warn(clippy::all)]

pub mod client;
pub mod endpoints;
pub mod transport;

pub use client::GeoStatClient;
pub use endpoints::{EndpointCatalog, DEFAULT_ENDPOINTS};
pub use gs_core::{Config, Error, Result};
