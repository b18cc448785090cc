//! Query store that orchestrates memoization, deduplication and invalidation.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::hooks::{ErrorHook, Operation};
use super::storage::{CacheStorage, MemoryStorage, StoredEntry};
use super::traits::{CacheResult, QueryKey};
use crate::error::ApiError;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// Tuning knobs for a `QueryStore`.
///
/// Failed requests are never retried, so there is no retry setting.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How long a fetched result is served without revalidation
  pub stale_time: Duration,
  /// How long an unread result is kept before garbage collection
  pub retention: Duration,
  /// Re-fetch everything on next access after the terminal regains focus
  pub refetch_on_focus: bool,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(5 * 60),
      retention: Duration::from_secs(10 * 60),
      refetch_on_focus: true,
    }
  }
}

struct InFlight<F> {
  family: F,
  generation: u64,
  fetch: SharedFetch,
}

struct StoreInner<F, S> {
  storage: S,
  options: StoreOptions,
  in_flight: Mutex<HashMap<String, InFlight<F>>>,
  generations: Mutex<HashMap<F, watch::Sender<u64>>>,
  hook: Option<Arc<dyn ErrorHook>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value).map_err(ApiError::decode)
}

impl<F, S> StoreInner<F, S>
where
  F: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static,
  S: CacheStorage<F>,
{
  fn generation(&self, family: F) -> u64 {
    lock(&self.generations)
      .get(&family)
      .map(|tx| *tx.borrow())
      .unwrap_or(0)
  }

  fn bump_generation(&self, family: F) -> u64 {
    let mut generations = lock(&self.generations);
    let tx = generations
      .entry(family)
      .or_insert_with(|| watch::channel(0).0);
    tx.send_modify(|g| *g += 1);
    let generation = *tx.borrow();
    generation
  }

  fn report(&self, operation: Operation, error: &ApiError) {
    if let Some(hook) = &self.hook {
      hook.on_error(operation, error);
    }
  }

  /// Record the outcome of a fetch and release its in-flight slot.
  fn settle(
    &self,
    hash: &str,
    family: F,
    generation: u64,
    description: &str,
    result: &Result<Value, ApiError>,
  ) {
    match result {
      Ok(value) => {
        if self.generation(family) == generation {
          self.storage.put(hash, StoredEntry::new(value.clone(), family));
        } else {
          debug!(key = %description, "discarding result fetched before invalidation");
        }
      }
      Err(e) => {
        warn!(key = %description, error = %e, "query failed");
        self.report(Operation::Query, e);
      }
    }

    // Stored before released, so a concurrent reader sees one or the other.
    let mut in_flight = lock(&self.in_flight);
    if in_flight
      .get(hash)
      .is_some_and(|f| f.family == family && f.generation == generation)
    {
      in_flight.remove(hash);
    }
  }
}

/// Keyed store of in-flight and completed requests.
///
/// Cloning is cheap and every clone shares the same entries. Build one store
/// per session and hand it to whatever needs it; dropping the last clone drops
/// all memoized data.
pub struct QueryStore<K: QueryKey, S = MemoryStorage<<K as QueryKey>::Family>> {
  inner: Arc<StoreInner<K::Family, S>>,
  _key: PhantomData<fn(&K)>,
}

impl<K: QueryKey> QueryStore<K> {
  /// Create an in-memory store.
  pub fn new(options: StoreOptions, hook: Option<Arc<dyn ErrorHook>>) -> Self {
    Self::with_storage(MemoryStorage::new(), options, hook)
  }
}

impl<K, S> QueryStore<K, S>
where
  K: QueryKey,
  S: CacheStorage<K::Family> + 'static,
{
  /// Create a store over the given storage backend.
  pub fn with_storage(storage: S, options: StoreOptions, hook: Option<Arc<dyn ErrorHook>>) -> Self {
    Self {
      inner: Arc::new(StoreInner {
        storage,
        options,
        in_flight: Mutex::new(HashMap::new()),
        generations: Mutex::new(HashMap::new()),
        hook,
      }),
      _key: PhantomData,
    }
  }

  /// Number of memoized results.
  pub fn len(&self) -> usize {
    self.inner.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.storage.is_empty()
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh result - return immediately
  /// 2. Result past its stale time - return it and revalidate in the background
  /// 3. Missing or invalidated - fetch and wait
  ///
  /// Identical keys fetched concurrently share one call to `fetcher`.
  pub async fn query<T, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, ApiError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let hash = key.cache_hash();

    if let Some(entry) = self.inner.storage.get(&hash) {
      if !entry.invalidated {
        let stale = entry.fetched_at.elapsed() > self.inner.options.stale_time;
        let data = decode(entry.value)?;

        if stale {
          debug!(key = %key.description(), "serving stale result, revalidating");
          let fetch = self.fetch_shared(key, hash, fetcher);
          tokio::spawn(async move {
            let _ = fetch.await;
          });
        } else {
          debug!(key = %key.description(), "cache hit");
        }

        return Ok(CacheResult::from_cache(data, entry.cached_at, stale));
      }
    }

    let value = self.fetch_shared(key, hash, fetcher).await?;
    Ok(CacheResult::from_network(decode(value)?))
  }

  /// Fetch from the network regardless of what is cached.
  ///
  /// Still joins an identical fetch that is already in flight.
  pub async fn refetch<T, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, ApiError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let value = self.fetch_shared(key, key.cache_hash(), fetcher).await?;
    Ok(CacheResult::from_network(decode(value)?))
  }

  /// Run a write once and invalidate `family` when it succeeds.
  ///
  /// Mutations are never deduplicated.
  pub async fn mutate<T, F, Fut>(&self, family: K::Family, fetcher: F) -> Result<T, ApiError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    match fetcher().await {
      Ok(data) => {
        self.invalidate(family);
        Ok(data)
      }
      Err(e) => {
        warn!(family = ?family, error = %e, "mutation failed");
        self.inner.report(Operation::Mutation, &e);
        Err(e)
      }
    }
  }

  /// Drop every memoized result of a family.
  ///
  /// Fetches of that family still in flight finish for their callers but
  /// their results are not stored.
  pub fn invalidate(&self, family: K::Family) {
    let generation = self.inner.bump_generation(family);
    let removed = self.inner.storage.remove_family(family);

    let detached = {
      let mut in_flight = lock(&self.inner.in_flight);
      let before = in_flight.len();
      in_flight.retain(|_, f| f.family != family);
      before - in_flight.len()
    };

    info!(family = ?family, generation, removed, detached, "invalidated");
  }

  /// Generation counter of a family; bumps on every invalidation.
  pub fn generation(&self, family: K::Family) -> u64 {
    self.inner.generation(family)
  }

  /// Watch the generation counter of a family.
  pub fn subscribe(&self, family: K::Family) -> watch::Receiver<u64> {
    lock(&self.inner.generations)
      .entry(family)
      .or_insert_with(|| watch::channel(0).0)
      .subscribe()
  }

  /// Called when the terminal regains focus.
  ///
  /// Returns how many results will be re-fetched on next access.
  pub fn on_window_focus(&self) -> usize {
    if !self.inner.options.refetch_on_focus {
      return 0;
    }
    let marked = self.inner.storage.mark_all_stale();
    debug!(marked, "focus regained, revalidating");
    marked
  }

  /// Evict results nobody read within the retention time.
  pub fn collect_garbage(&self) -> usize {
    let Some(cutoff) = Instant::now().checked_sub(self.inner.options.retention) else {
      return 0;
    };
    let evicted = self.inner.storage.evict_unused(cutoff);
    if evicted > 0 {
      debug!(evicted, "evicted unused results");
    }
    evicted
  }

  /// Forget everything, including fetches in flight.
  pub fn clear(&self) {
    self.inner.storage.clear();

    // A family only ever fetched has no generation entry yet; its pending
    // fetches must see a bump too or they would store into the cleared map.
    let mut families: HashSet<K::Family> = lock(&self.inner.in_flight)
      .drain()
      .map(|(_, f)| f.family)
      .collect();
    families.extend(lock(&self.inner.generations).keys().copied());
    for family in families {
      self.inner.bump_generation(family);
    }
    info!("query store cleared");
  }

  /// Join the in-flight fetch for `hash` or start a new one.
  fn fetch_shared<T, F, Fut>(&self, key: &K, hash: String, fetcher: F) -> SharedFetch
  where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let mut in_flight = lock(&self.inner.in_flight);
    if let Some(existing) = in_flight.get(&hash) {
      debug!(key = %key.description(), "joining in-flight fetch");
      return existing.fetch.clone();
    }

    let family = key.family();
    let generation = self.inner.generation(family);
    let description = key.description();
    let inner = Arc::clone(&self.inner);
    let slot = hash.clone();

    let fetch = async move {
      debug!(key = %description, "fetching");
      let result = match fetcher().await {
        Ok(data) => serde_json::to_value(data).map_err(ApiError::decode),
        Err(e) => Err(e),
      };
      inner.settle(&slot, family, generation, &description, &result);
      result
    }
    .boxed()
    .shared();

    in_flight.insert(
      hash,
      InFlight {
        family,
        generation,
        fetch: fetch.clone(),
      },
    );
    fetch
  }
}

impl<K: QueryKey, S> Clone for QueryStore<K, S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      _key: PhantomData,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, NoopStorage};
  use crate::error::Code;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  enum Family {
    Tags,
    Sales,
  }

  #[derive(Debug, Clone)]
  enum TestKey {
    Tags(u32),
    Sales(u32),
  }

  impl QueryKey for TestKey {
    type Family = Family;

    fn cache_hash(&self) -> String {
      match self {
        TestKey::Tags(page) => format!("tags:{}", page),
        TestKey::Sales(page) => format!("sales:{}", page),
      }
    }

    fn description(&self) -> String {
      self.cache_hash()
    }

    fn family(&self) -> Family {
      match self {
        TestKey::Tags(_) => Family::Tags,
        TestKey::Sales(_) => Family::Sales,
      }
    }
  }

  #[derive(Default)]
  struct RecordingHook {
    seen: Mutex<Vec<(Operation, ApiError)>>,
  }

  impl ErrorHook for RecordingHook {
    fn on_error(&self, operation: Operation, error: &ApiError) {
      self.seen.lock().unwrap().push((operation, error.clone()));
    }
  }

  fn store() -> QueryStore<TestKey> {
    QueryStore::new(StoreOptions::default(), None)
  }

  /// Fetcher that counts calls and returns the call number.
  fn counting(
    calls: &Arc<AtomicUsize>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<usize, ApiError>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(n)
      }
      .boxed()
    }
  }

  fn failing(
    calls: &Arc<AtomicUsize>,
    error: ApiError,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<usize, ApiError>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Err(error)
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_concurrent_identical_queries_share_one_fetch() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    let (a, b) = tokio::join!(
      store.query(&key, counting(&calls)),
      store.query(&key, counting(&calls)),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap().data, 1);
    assert_eq!(b.unwrap().data, 1);
  }

  #[tokio::test]
  async fn test_different_keys_fetch_independently() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b) = tokio::join!(
      store.query(&TestKey::Tags(1), counting(&calls)),
      store.query(&TestKey::Tags(2), counting(&calls)),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_joined_failure_reaches_every_caller_and_hook_once() {
    let hook = Arc::new(RecordingHook::default());
    let store: QueryStore<TestKey> = QueryStore::new(StoreOptions::default(), Some(hook.clone()));
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);
    let error = ApiError::remote(Code::Internal, "boom");

    let (a, b) = tokio::join!(
      store.query(&key, failing(&calls, error.clone())),
      store.query(&key, failing(&calls, error.clone())),
    );

    assert_eq!(a.unwrap_err(), error);
    assert_eq!(b.unwrap_err(), error);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let seen = hook.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(Operation::Query, error)]);
  }

  #[tokio::test]
  async fn test_failures_are_not_retried_or_cached() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    let first = store
      .query(&key, failing(&calls, ApiError::Network("refused".into())))
      .await;
    assert!(first.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.is_empty());

    let second = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_results_are_memoized_and_stale_ones_revalidated() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    let first = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    let second = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    let third = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(third.source, CacheSource::CacheStale);
    assert_eq!(third.data, 1);

    // Let the background revalidation finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let fourth = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(fourth.source, CacheSource::CacheFresh);
    assert_eq!(fourth.data, 2);
  }

  #[tokio::test]
  async fn test_mutation_invalidates_its_family_only() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    store.query(&TestKey::Sales(1), counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    store
      .mutate(Family::Tags, || async { Ok::<_, ApiError>(()) })
      .await
      .unwrap();

    let tags = store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    assert_eq!(tags.source, CacheSource::Network);
    assert_eq!(tags.data, 3);

    let sales = store.query(&TestKey::Sales(1), counting(&calls)).await.unwrap();
    assert_eq!(sales.source, CacheSource::CacheFresh);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_failed_mutation_reports_and_keeps_cache() {
    let hook = Arc::new(RecordingHook::default());
    let store: QueryStore<TestKey> = QueryStore::new(StoreOptions::default(), Some(hook.clone()));
    let calls = Arc::new(AtomicUsize::new(0));

    store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();

    let error = ApiError::unauthenticated("expired");
    let result = store
      .mutate(Family::Tags, || {
        let error = error.clone();
        async move { Err::<(), _>(error) }
      })
      .await;
    assert_eq!(result.unwrap_err(), error);

    let seen = hook.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(Operation::Mutation, error)]);

    let tags = store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    assert_eq!(tags.source, CacheSource::CacheFresh);
  }

  #[tokio::test]
  async fn test_mutations_are_never_deduplicated() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b) = tokio::join!(
      store.mutate(Family::Tags, counting(&calls)),
      store.mutate(Family::Tags, counting(&calls)),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_in_flight_during_invalidation_is_not_stored() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    let background = {
      let store = store.clone();
      let fetch = counting(&calls);
      tokio::spawn(async move { store.query(&TestKey::Tags(1), fetch).await })
    };

    // Let the spawned query register its fetch.
    tokio::time::sleep(Duration::from_millis(1)).await;
    store.invalidate(Family::Tags);

    let result = background.await.unwrap().unwrap();
    assert_eq!(result.data, 1);
    assert!(store.is_empty());

    let next = store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    assert_eq!(next.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_subscribers_see_generation_bumps() {
    let store = store();
    let mut rx = store.subscribe(Family::Tags);
    assert_eq!(*rx.borrow_and_update(), 0);

    store.invalidate(Family::Sales);
    assert!(!rx.has_changed().unwrap());

    store.invalidate(Family::Tags);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), 1);
    assert_eq!(store.generation(Family::Tags), 1);
  }

  #[tokio::test]
  async fn test_focus_forces_refetch() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(store.on_window_focus(), 1);

    let again = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(again.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_focus_refetch_can_be_disabled() {
    let options = StoreOptions {
      refetch_on_focus: false,
      ..StoreOptions::default()
    };
    let store: QueryStore<TestKey> = QueryStore::new(options, None);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(store.on_window_focus(), 0);

    let again = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(again.source, CacheSource::CacheFresh);
  }

  #[tokio::test]
  async fn test_refetch_bypasses_fresh_cache() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    store.query(&key, counting(&calls)).await.unwrap();
    let refreshed = store.refetch(&key, counting(&calls)).await.unwrap();
    assert_eq!(refreshed.data, 2);

    let cached = store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(cached.data, 2);
    assert_eq!(cached.source, CacheSource::CacheFresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_garbage_collection_evicts_unread_results() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    assert_eq!(store.collect_garbage(), 0);

    tokio::time::advance(Duration::from_secs(11 * 60)).await;
    assert_eq!(store.collect_garbage(), 1);
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_noop_storage_still_deduplicates() {
    let store: QueryStore<TestKey, NoopStorage> =
      QueryStore::with_storage(NoopStorage, StoreOptions::default(), None);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey::Tags(1);

    let (a, b) = tokio::join!(
      store.query(&key, counting(&calls)),
      store.query(&key, counting(&calls)),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    store.query(&key, counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_clear_drops_everything() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut rx = store.subscribe(Family::Tags);

    store.query(&TestKey::Tags(1), counting(&calls)).await.unwrap();
    store.clear();

    assert!(store.is_empty());
    assert!(rx.has_changed().unwrap());
  }

  #[tokio::test]
  async fn test_fetch_in_flight_during_clear_is_not_stored() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));

    // Sales is never subscribed to or invalidated before the clear.
    let background = {
      let store = store.clone();
      let fetch = counting(&calls);
      tokio::spawn(async move { store.query(&TestKey::Sales(1), fetch).await })
    };

    tokio::time::sleep(Duration::from_millis(1)).await;
    store.clear();

    let result = background.await.unwrap().unwrap();
    assert_eq!(result.data, 1);
    assert!(store.is_empty());
    assert_eq!(store.generation(Family::Sales), 1);
  }
}
