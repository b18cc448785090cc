//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// A memoized response payload.
#[derive(Debug, Clone)]
pub struct StoredEntry<F> {
  /// The response payload as JSON
  pub value: Value,
  /// Resource family of the key that produced it
  pub family: F,
  /// When the payload arrived, for stale time checks
  pub fetched_at: Instant,
  /// Wall clock counterpart of `fetched_at`, for display
  pub cached_at: DateTime<Utc>,
  /// Set when the next access must wait for a fresh fetch
  pub invalidated: bool,
  /// Last time a reader looked at the entry
  pub last_access: Instant,
}

impl<F> StoredEntry<F> {
  pub fn new(value: Value, family: F) -> Self {
    let now = Instant::now();
    Self {
      value,
      family,
      fetched_at: now,
      cached_at: Utc::now(),
      invalidated: false,
      last_access: now,
    }
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage<F: Copy + PartialEq>: Send + Sync {
  /// Get an entry and record the access.
  fn get(&self, key: &str) -> Option<StoredEntry<F>>;

  /// Insert or replace an entry.
  fn put(&self, key: &str, entry: StoredEntry<F>);

  /// Drop every entry of a family. Returns how many were dropped.
  fn remove_family(&self, family: F) -> usize;

  /// Force every entry to be re-fetched on next access.
  fn mark_all_stale(&self) -> usize;

  /// Drop entries nobody read since `cutoff`.
  fn evict_unused(&self, cutoff: Instant) -> usize;

  fn clear(&self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl<F: Copy + PartialEq> CacheStorage<F> for NoopStorage {
  fn get(&self, _key: &str) -> Option<StoredEntry<F>> {
    None // Always miss
  }

  fn put(&self, _key: &str, _entry: StoredEntry<F>) {}

  fn remove_family(&self, _family: F) -> usize {
    0
  }

  fn mark_all_stale(&self) -> usize {
    0
  }

  fn evict_unused(&self, _cutoff: Instant) -> usize {
    0
  }

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }
}

impl<F: Copy + PartialEq, S: CacheStorage<F> + ?Sized> CacheStorage<F> for Box<S> {
  fn get(&self, key: &str) -> Option<StoredEntry<F>> {
    (**self).get(key)
  }

  fn put(&self, key: &str, entry: StoredEntry<F>) {
    (**self).put(key, entry)
  }

  fn remove_family(&self, family: F) -> usize {
    (**self).remove_family(family)
  }

  fn mark_all_stale(&self) -> usize {
    (**self).mark_all_stale()
  }

  fn evict_unused(&self, cutoff: Instant) -> usize {
    (**self).evict_unused(cutoff)
  }

  fn clear(&self) {
    (**self).clear()
  }

  fn len(&self) -> usize {
    (**self).len()
  }
}

/// In-memory storage, lives as long as the store that owns it.
pub struct MemoryStorage<F> {
  entries: Mutex<HashMap<String, StoredEntry<F>>>,
}

impl<F> Default for MemoryStorage<F> {
  fn default() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }
}

impl<F> MemoryStorage<F> {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredEntry<F>>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl<F: Copy + PartialEq + Send> CacheStorage<F> for MemoryStorage<F> {
  fn get(&self, key: &str) -> Option<StoredEntry<F>> {
    let mut entries = self.lock();
    let entry = entries.get_mut(key)?;
    entry.last_access = Instant::now();
    Some(entry.clone())
  }

  fn put(&self, key: &str, entry: StoredEntry<F>) {
    self.lock().insert(key.to_string(), entry);
  }

  fn remove_family(&self, family: F) -> usize {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, entry| entry.family != family);
    before - entries.len()
  }

  fn mark_all_stale(&self) -> usize {
    let mut entries = self.lock();
    for entry in entries.values_mut() {
      entry.invalidated = true;
    }
    entries.len()
  }

  fn evict_unused(&self, cutoff: Instant) -> usize {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, entry| entry.last_access >= cutoff);
    before - entries.len()
  }

  fn clear(&self) {
    self.lock().clear();
  }

  fn len(&self) -> usize {
    self.lock().len()
  }
}
