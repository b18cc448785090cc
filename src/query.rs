//! Async query abstraction for views.
//!
//! Inspired by TanStack Query, a `Query<T>` runs a fetch on the runtime and
//! hands the outcome back to the UI thread, which polls it on every tick.
//! Memoization, deduplication and staleness live in `QueryStore`; this type
//! only tracks what one view is waiting for.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.get_cart().await.map(|r| r.data) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::error::ApiError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query with state management.
///
/// Built either around a fetcher (`new`), which `fetch`/`refetch` call again,
/// or empty (`idle`) for one-off futures handed to `start`.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: Option<FetcherFn<T>>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query with the given fetcher function.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Some(Box::new(move || Box::pin(fetcher()))),
      receiver: None,
    }
  }

  /// A query without a fetcher, driven by `start`.
  pub fn idle() -> Self {
    Self {
      state: QueryState::Idle,
      fetcher: None,
      receiver: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch();
  }

  /// Run a one-off future in place of the fetcher. Replaces any pending fetch.
  pub fn start<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.spawn(Box::pin(future));
  }

  /// Forget the outcome and any pending fetch.
  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = QueryState::Idle;
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending
        self.state = QueryState::Error(ApiError::Network("query was cancelled".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let Some(fetcher) = &self.fetcher else {
      return;
    };
    let future = fetcher();
    self.spawn(future);
  }

  fn spawn(&mut self, future: BoxFuture<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Code;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, ApiError>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> =
      Query::new(|| async { Err(ApiError::remote(Code::NotFound, "no such product")) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(
      query.error(),
      Some(&ApiError::remote(Code::NotFound, "no such product"))
    );
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, ApiError>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ApiError>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_idle_query_runs_started_future() {
    let mut query: Query<&'static str> = Query::idle();

    query.fetch();
    assert!(matches!(query.state(), QueryState::Idle));

    query.start(async { Ok("added") });
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.data(), Some(&"added"));

    query.reset();
    assert!(matches!(query.state(), QueryState::Idle));
  }
}
