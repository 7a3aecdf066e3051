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

//! Per-request retry and in-flight bookkeeping owned by one loader.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use gs_core::RequestParams;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A load that several callers may await.
pub type SharedLoad = Shared<BoxFuture<'static, Value>>;

/// SHA-256 hex over `parts`, unit-separated.
pub fn request_key(parts: &[&str]) -> String {
  let mut hasher = Sha256::new();
  for part in parts {
    hasher.update(part.as_bytes());
    hasher.update([0x1f]);
  }
  hex::encode(hasher.finalize())
}

/// Key of one field load within a section.
pub fn field_request_key(field: &str, endpoint: &str, params: &RequestParams) -> String {
  request_key(&[field, endpoint, &params.canonical()])
}

/// Key of a single gateway call, shared by every field and section using it.
pub fn fetch_request_key(endpoint: &str, params: &RequestParams) -> String {
  request_key(&[endpoint, &params.canonical()])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryState {
  pub retries: u32,
  pub last_error: Option<String>,
  pub endpoint: String,
  pub updated_at: DateTime<Utc>,
}

/// Outcome of [`RequestState::join_or_start`].
pub enum InFlight {
  /// Another caller already started this load
  Joined(SharedLoad),
  /// This caller registered the load, tagged `id`
  Started { id: u64, load: SharedLoad },
}

/// Retry counters and in-flight loads, keyed by request key.
pub struct RequestState {
  max_retries: u32,
  retries: DashMap<String, RetryState>,
  in_flight: DashMap<String, (u64, SharedLoad)>,
  next_id: AtomicU64,
}

impl RequestState {
  pub fn new(max_retries: u32) -> Self {
    Self {
      max_retries,
      retries: DashMap::new(),
      in_flight: DashMap::new(),
      next_id: AtomicU64::new(1),
    }
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }

  /// True once `key` has failed `max_retries` times without a reset.
  pub fn is_exhausted(&self, key: &str) -> bool {
    self.retries.get(key).is_some_and(|state| state.retries >= self.max_retries)
  }

  /// Count one failure, returning the new retry count.
  pub fn record_failure(&self, key: &str, endpoint: &str, error: &str) -> u32 {
    let mut state = self.retries.entry(key.to_string()).or_insert_with(|| RetryState {
      retries: 0,
      last_error: None,
      endpoint: endpoint.to_string(),
      updated_at: Utc::now(),
    });
    state.retries += 1;
    state.last_error = Some(error.to_string());
    state.updated_at = Utc::now();
    state.retries
  }

  pub fn record_success(&self, key: &str) {
    self.retries.remove(key);
  }

  pub fn retry_state(&self, key: &str) -> Option<RetryState> {
    self.retries.get(key).map(|state| state.clone())
  }

  /// Clear retry counters whose endpoint contains `filter`, or all of them.
  /// Returns how many were cleared.
  pub fn reset_retries(&self, filter: Option<&str>) -> usize {
    let before = self.retries.len();
    match filter {
      Some(filter) => self.retries.retain(|_, state| !state.endpoint.contains(filter)),
      None => self.retries.clear(),
    }
    let cleared = before.saturating_sub(self.retries.len());
    debug!("Reset {} retry counters (filter: {:?})", cleared, filter);
    cleared
  }

  pub fn reset_all_retries(&self) -> usize {
    self.reset_retries(None)
  }

  /// Join the load registered under `key`, or register the one `start` builds.
  ///
  /// The choice is made under the map's entry lock, so concurrent callers
  /// never start the same key twice. `start` receives the entry id and must
  /// only build the future.
  pub fn join_or_start<F>(&self, key: &str, start: F) -> InFlight
  where
    F: FnOnce(u64) -> BoxFuture<'static, Value>,
  {
    match self.in_flight.entry(key.to_string()) {
      Entry::Occupied(entry) => InFlight::Joined(entry.get().1.clone()),
      Entry::Vacant(entry) => {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let load = start(id).shared();
        entry.insert((id, load.clone()));
        InFlight::Started { id, load }
      }
    }
  }

  /// Remove the in-flight entry for `key` if it is still the one tagged `id`.
  pub fn finish_in_flight(&self, key: &str, id: u64) -> bool {
    self.in_flight.remove_if(key, |_, (current, _)| *current == id).is_some()
  }

  pub fn in_flight_count(&self) -> usize {
    self.in_flight.len()
  }
}

impl Default for RequestState {
  fn default() -> Self {
    Self::new(gs_core::MAX_RETRIES)
  }
}

impl std::fmt::Debug for RequestState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RequestState")
      .field("max_retries", &self.max_retries)
      .field("retries", &self.retries.len())
      .field("in_flight", &self.in_flight.len())
      .finish()
  }
}
