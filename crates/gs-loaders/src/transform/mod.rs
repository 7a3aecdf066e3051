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

//! TransformFactory: turns a declarative [`TransformSpec`] into a callable
//! [`Transform`] that reshapes raw payloads into rows.
//!
//! ```rust,ignore
//! let factory = TransformFactory::new(StrategyRegistry::with_builtins());
//! let transform = factory.create_transform(&TransformSpec::Standard(StandardConfig::default()))?;
//! let rows = transform.apply(&raw)?;
//! ```

pub mod aggregate;
pub mod standard;
pub mod strategies;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{LoaderError, LoaderResult};

pub use aggregate::{AggregateConfig, AggregateTransform};
pub use standard::{StandardConfig, StandardTransform, UNCATEGORIZED};
pub use strategies::{CustomTransformFn, StrategyRegistry};

/// Declarative transform description, as found in section metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformSpec {
  Standard(StandardConfig),
  Aggregate(AggregateConfig),
  /// Looked up by id in the [`StrategyRegistry`]
  Custom {
    strategy: String,
  },
  #[default]
  Passthrough,
}

impl TransformSpec {
  pub fn kind(&self) -> &'static str {
    match self {
      TransformSpec::Standard(_) => "standard",
      TransformSpec::Aggregate(_) => "aggregate",
      TransformSpec::Custom { .. } => "custom",
      TransformSpec::Passthrough => "passthrough",
    }
  }
}

type TransformFn = Arc<dyn Fn(&Value) -> LoaderResult<Value> + Send + Sync>;

/// A compiled transform, cheap to clone.
#[derive(Clone)]
pub struct Transform {
  label: String,
  apply: TransformFn,
}

impl Transform {
  pub fn passthrough() -> Self {
    Self {
      label: "passthrough".to_string(),
      apply: Arc::new(|raw: &Value| -> LoaderResult<Value> { Ok(raw.clone()) }),
    }
  }

  pub fn apply(&self, raw: &Value) -> LoaderResult<Value> {
    (self.apply)(raw)
  }

  /// Transform kind, plus the strategy id for custom transforms.
  pub fn label(&self) -> &str {
    &self.label
  }
}

impl std::fmt::Debug for Transform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Transform").field("label", &self.label).finish()
  }
}

/// Builds transforms from specs, resolving custom strategies up front.
#[derive(Debug, Clone)]
pub struct TransformFactory {
  strategies: Arc<StrategyRegistry>,
}

impl Default for TransformFactory {
  fn default() -> Self {
    Self::new(StrategyRegistry::with_builtins())
  }
}

impl TransformFactory {
  pub fn new(strategies: StrategyRegistry) -> Self {
    Self { strategies: Arc::new(strategies) }
  }

  pub fn strategies(&self) -> &StrategyRegistry {
    &self.strategies
  }

  pub fn create_transform(&self, spec: &TransformSpec) -> LoaderResult<Transform> {
    let transform = match spec {
      TransformSpec::Standard(config) => {
        let standard = StandardTransform::new(config);
        Transform {
          label: spec.kind().to_string(),
          apply: Arc::new(move |raw: &Value| standard.apply(raw)),
        }
      }
      TransformSpec::Aggregate(config) => {
        let aggregate = AggregateTransform::new(config)?;
        Transform {
          label: spec.kind().to_string(),
          apply: Arc::new(move |raw: &Value| aggregate.apply(raw)),
        }
      }
      TransformSpec::Custom { strategy } => {
        let body = self
          .strategies
          .get(strategy)
          .ok_or_else(|| LoaderError::UnknownStrategy(strategy.clone()))?;
        Transform { label: format!("custom:{}", strategy), apply: body }
      }
      TransformSpec::Passthrough => Transform::passthrough(),
    };
    Ok(transform)
  }
}
