//! # gs-loaders
//!
//! Section data loading for geostat reports.
//!
//! This crate provides:
//! - Field-mapping resolution from a declarative section registry
//! - The TransformFactory turning raw payloads into table rows
//! - Aggregation strategies for results collected over several location codes
//! - Retry capping, in-flight de-duplication and a cache-first response cache
//! - [`SectionDataLoader`], which ties the above together

pub mod aggregation;
pub mod cache;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod request_state;
pub mod transform;
pub mod values;

// Re-export commonly used types
pub use aggregation::{AggregationRule, AggregationRules, AggregationStrategy};
pub use cache::{CacheConfig, CacheHelper, CacheResult, InMemoryResponseCache};
pub use error::{LoaderError, LoaderResult};
pub use loader::{LoaderConfig, SectionDataLoader};
pub use mapping::{
  FieldMapping, FieldMappingResolver, FieldMetadata, SectionConfig, SectionMetadata,
  SectionRegistry,
};
pub use request_state::{fetch_request_key, field_request_key, RetryState};
pub use transform::{StrategyRegistry, Transform, TransformFactory, TransformSpec};

// Prelude for convenient imports
pub mod prelude {
  pub use crate::{
    CacheConfig, FieldMappingResolver, LoaderConfig, LoaderError, LoaderResult,
    SectionDataLoader, SectionRegistry, StrategyRegistry, TransformFactory, TransformSpec,
  };
}
