//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for keys that identify a memoized request.
///
/// Two keys with the same `cache_hash` share a cache entry and an in-flight fetch.
pub trait QueryKey: Send + Sync {
  /// Resource family the key belongs to; mutations invalidate whole families.
  type Family: Copy + Eq + Hash + Debug + Send + Sync + 'static;

  /// Stable identifier built from the endpoint and its canonical parameters.
  fn cache_hash(&self) -> String;

  /// Human readable description for logs.
  fn description(&self) -> String;

  fn family(&self) -> Self::Family;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at: Some(cached_at),
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      cached_at: self.cached_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache past its stale time; a background re-fetch was started
  CacheStale,
}
