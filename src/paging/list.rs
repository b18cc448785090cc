use futures::Stream;
use std::fmt;
use std::marker::PhantomData;
use tokio::sync::watch;
use tracing::debug;

use super::window::{PageCursor, PageSource, PageWindow};
use crate::error::ApiError;

/// Fetch state of a paged list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
  /// No fetch in flight, more pages may exist
  Idle,
  /// One more page is being appended
  FetchingNext,
  /// The server reported there are no further pages
  Exhausted,
}

/// "showing X-Y of Z" for one page of a stitched list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRange {
  /// 1-based index of the first item on the page, 0 for an empty page
  pub start: usize,
  pub end: usize,
  /// Total reported by the most recently fetched page
  pub total: Option<u64>,
}

impl fmt::Display for DisplayRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.end == 0 {
      return f.write_str("no results");
    }
    match self.total {
      Some(total) => write!(f, "showing {}-{} of {}", self.start, self.end, total),
      None => write!(f, "showing {}-{}", self.start, self.end),
    }
  }
}

/// A lazily fetched remote list presented as one ordered sequence.
///
/// Fetches take `&mut self`, so one list never has two page requests in
/// flight and windows are always appended in cursor order.
pub struct PagedList<T, P> {
  source: P,
  limit: u32,
  windows: Vec<PageWindow<T>>,
  state: ListState,
  latest_total: Option<u64>,
  invalidation: Option<watch::Receiver<u64>>,
  _item: PhantomData<fn() -> T>,
}

impl<T, P: PageSource<T>> PagedList<T, P> {
  pub fn new(source: P, limit: u32) -> Self {
    Self {
      source,
      limit: limit.max(1),
      windows: Vec::new(),
      state: ListState::Idle,
      latest_total: None,
      invalidation: None,
      _item: PhantomData,
    }
  }

  /// Reset the list whenever the watched generation changes.
  pub fn invalidated_by(mut self, rx: watch::Receiver<u64>) -> Self {
    self.invalidation = Some(rx);
    self
  }

  pub fn state(&self) -> ListState {
    self.state
  }

  pub fn limit(&self) -> u32 {
    self.limit
  }

  /// Number of windows fetched so far.
  pub fn fetched(&self) -> usize {
    self.windows.len()
  }

  pub fn windows(&self) -> &[PageWindow<T>] {
    &self.windows
  }

  /// Already fetched window for a 1-based page number.
  pub fn window(&self, page: usize) -> Option<&PageWindow<T>> {
    page.checked_sub(1).and_then(|i| self.windows.get(i))
  }

  /// Every fetched item in list order.
  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.windows.iter().flat_map(|w| w.items.iter())
  }

  /// Total reported by the most recently fetched page.
  pub fn total(&self) -> Option<u64> {
    self.latest_total
  }

  pub fn is_exhausted(&self) -> bool {
    self.state == ListState::Exhausted
  }

  /// Page count implied by the reported total, if any.
  pub fn page_count(&self) -> Option<usize> {
    let total = self.latest_total? as usize;
    Some(total.div_ceil(self.limit as usize).max(1))
  }

  /// Drop every window; the next access starts from page 1.
  pub fn reset(&mut self) {
    self.windows.clear();
    self.state = ListState::Idle;
    self.latest_total = None;
  }

  fn sync_invalidation(&mut self) {
    let changed = match &mut self.invalidation {
      Some(rx) => matches!(rx.has_changed(), Ok(true)),
      None => false,
    };

    if changed {
      if let Some(rx) = &mut self.invalidation {
        let _ = rx.borrow_and_update();
      }
      debug!(pages = self.windows.len(), "list invalidated, starting over");
      self.reset();
    }
  }

  /// Fetch and append the page after the last fetched one.
  ///
  /// Returns `None` once the list is exhausted.
  pub async fn fetch_next(&mut self) -> Result<Option<&PageWindow<T>>, ApiError> {
    self.sync_invalidation();

    if self.state == ListState::Exhausted {
      return Ok(None);
    }

    let cursor = match self.windows.last().map(|w| w.next.clone()) {
      None => PageCursor::Start,
      Some(Some(next)) => next,
      Some(None) => {
        self.state = ListState::Exhausted;
        return Ok(None);
      }
    };

    let ordinal = self.windows.len() + 1;
    let request = cursor.request(ordinal as u32, self.limit);

    // A dropped fetch leaves FetchingNext behind; the next call simply overwrites it.
    self.state = ListState::FetchingNext;
    debug!(page = ordinal, cursor = ?cursor, "fetching next page");

    let page = match self.source.fetch_page(request).await {
      Ok(page) => page,
      Err(e) => {
        self.state = ListState::Idle;
        return Err(e);
      }
    };

    self.latest_total = page.total.or(self.latest_total);

    if page.items.is_empty() && ordinal > 1 {
      self.state = ListState::Exhausted;
      return Ok(None);
    }

    self.state = if page.next.is_some() {
      ListState::Idle
    } else {
      ListState::Exhausted
    };

    let window = PageWindow {
      ordinal,
      cursor,
      items: page.items,
      next: page.next,
      total: page.total,
    };
    debug_assert!(self
      .windows
      .last()
      .map_or(true, |last| last.is_followed_by(&window)));
    self.windows.push(window);

    Ok(self.windows.last())
  }

  /// Window for a 1-based page number, fetching the pages in between if needed.
  ///
  /// Already fetched pages are served without a call. When the list ends
  /// before `page`, the last available window is returned instead.
  pub async fn jump_to(&mut self, page: usize) -> Result<Option<&PageWindow<T>>, ApiError> {
    self.sync_invalidation();
    let page = page.max(1);

    while self.windows.len() < page && self.state != ListState::Exhausted {
      if self.fetch_next().await?.is_none() {
        break;
      }
    }

    Ok(self.windows.get(page - 1).or(self.windows.last()))
  }

  /// Re-fetch one page with its original cursor and replace it in place.
  ///
  /// Later windows are dropped when the page now ends somewhere else.
  pub async fn refresh_page(&mut self, page: usize) -> Result<Option<&PageWindow<T>>, ApiError> {
    self.sync_invalidation();

    let Some(index) = page.checked_sub(1).filter(|i| *i < self.windows.len()) else {
      return self.jump_to(page).await;
    };

    let cursor = self.windows[index].cursor.clone();
    let previous_next = self.windows[index].next.clone();
    let request = cursor.request(page as u32, self.limit);

    debug!(page, "refreshing page");
    let fetched = self.source.fetch_page(request).await?;
    self.latest_total = fetched.total.or(self.latest_total);

    let window = PageWindow {
      ordinal: page,
      cursor,
      items: fetched.items,
      next: fetched.next,
      total: fetched.total,
    };

    let is_tail = index + 1 == self.windows.len();
    if window.next != previous_next {
      self.windows.truncate(index + 1);
    }
    if is_tail || window.next != previous_next {
      self.state = if window.next.is_some() {
        ListState::Idle
      } else {
        ListState::Exhausted
      };
    }

    self.windows[index] = window;
    Ok(self.windows.get(index))
  }

  /// Position of a fetched page within the whole list.
  pub fn display_range(&self, page: usize) -> Option<DisplayRange> {
    let index = page.checked_sub(1)?;
    let window = self.windows.get(index)?;

    if window.items.is_empty() {
      return Some(DisplayRange {
        start: 0,
        end: 0,
        total: self.latest_total,
      });
    }

    let before: usize = self.windows[..index].iter().map(|w| w.items.len()).sum();
    Some(DisplayRange {
      start: before + 1,
      end: before + window.items.len(),
      total: self.latest_total,
    })
  }

  /// Consume the list into a stream of the windows it fetches from here on.
  ///
  /// Pages are produced on demand, one request at a time. The stream ends
  /// when the list is exhausted or after yielding the first error.
  pub fn into_pages(self) -> impl Stream<Item = Result<PageWindow<T>, ApiError>>
  where
    T: Clone,
  {
    futures::stream::unfold(Some(self), |list| async move {
      let mut list = list?;
      match list.fetch_next().await.map(|w| w.cloned()) {
        Ok(Some(window)) => Some((Ok(window), Some(list))),
        Ok(None) => None,
        Err(e) => Some((Err(e), None)),
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Code;
  use crate::paging::{Page, PageRequest};
  use futures::StreamExt;
  use std::future::Future;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  #[derive(Default)]
  struct FakeInner {
    len: Mutex<usize>,
    tokens: bool,
    fail_on: Mutex<Option<u32>>,
    requests: Mutex<Vec<PageRequest>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
  }

  /// Serves items 1..=len, `limit` per page.
  #[derive(Clone)]
  struct FakeSource(Arc<FakeInner>);

  impl FakeSource {
    fn numbered(len: usize) -> Self {
      Self(Arc::new(FakeInner {
        len: Mutex::new(len),
        ..FakeInner::default()
      }))
    }

    fn tokens(len: usize) -> Self {
      Self(Arc::new(FakeInner {
        len: Mutex::new(len),
        tokens: true,
        ..FakeInner::default()
      }))
    }

    fn pages_requested(&self) -> Vec<u32> {
      self.0.requests.lock().unwrap().iter().map(|r| r.page).collect()
    }

    fn requests(&self) -> Vec<PageRequest> {
      self.0.requests.lock().unwrap().clone()
    }

    fn set_len(&self, len: usize) {
      *self.0.len.lock().unwrap() = len;
    }

    fn fail_on(&self, page: Option<u32>) {
      *self.0.fail_on.lock().unwrap() = page;
    }
  }

  impl PageSource<u32> for FakeSource {
    fn fetch_page(
      &self,
      request: PageRequest,
    ) -> impl Future<Output = Result<Page<u32>, ApiError>> + Send {
      let inner = Arc::clone(&self.0);
      async move {
        inner.requests.lock().unwrap().push(request.clone());
        let now = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        inner.active.fetch_sub(1, Ordering::SeqCst);

        if *inner.fail_on.lock().unwrap() == Some(request.page) {
          return Err(ApiError::remote(Code::Unavailable, "down"));
        }

        let len = *inner.len.lock().unwrap();
        let limit = request.limit as usize;
        let start = (request.page as usize - 1) * limit;
        let end = (start + limit).min(len).max(start);
        let items = (start..end).map(|i| i as u32 + 1).collect();

        let next = if end < len {
          Some(if inner.tokens {
            PageCursor::Token(format!("after-{}", request.page))
          } else {
            PageCursor::Page(request.page + 1)
          })
        } else {
          None
        };

        Ok(Page {
          items,
          next,
          total: Some(len as u64),
        })
      }
    }
  }

  #[tokio::test]
  async fn test_first_fetch_starts_at_page_one() {
    let source = FakeSource::numbered(25);
    let mut list = PagedList::new(source.clone(), 10);

    let window = list.fetch_next().await.unwrap().unwrap();
    assert_eq!(window.ordinal, 1);
    assert_eq!(window.cursor, PageCursor::Start);
    assert_eq!(window.items, (1..=10).collect::<Vec<_>>());
    assert_eq!(list.state(), ListState::Idle);
    assert_eq!(source.pages_requested(), vec![1]);
  }

  #[tokio::test]
  async fn test_jump_fetches_missing_pages_in_order_one_at_a_time() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);

    let window = list.jump_to(3).await.unwrap().unwrap();
    assert_eq!(window.ordinal, 3);
    assert_eq!(window.items, (21..=30).collect::<Vec<_>>());

    assert_eq!(source.pages_requested(), vec![1, 2, 3]);
    assert_eq!(source.0.max_active.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_jump_continues_from_fetched_pages() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);

    list.jump_to(2).await.unwrap();
    list.jump_to(4).await.unwrap();
    assert_eq!(source.pages_requested(), vec![1, 2, 3, 4]);
  }

  #[tokio::test]
  async fn test_backward_navigation_is_free() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);
    list.jump_to(3).await.unwrap();

    let second = list.jump_to(2).await.unwrap().unwrap().items.clone();
    let first = list.jump_to(1).await.unwrap().unwrap().items.clone();

    assert_eq!(second, (11..=20).collect::<Vec<_>>());
    assert_eq!(first, (1..=10).collect::<Vec<_>>());
    assert_eq!(source.pages_requested().len(), 3);
  }

  #[tokio::test]
  async fn test_jump_past_the_end_shows_last_page() {
    let source = FakeSource::numbered(25);
    let mut list = PagedList::new(source.clone(), 10);

    let window = list.jump_to(9).await.unwrap().unwrap();
    assert_eq!(window.ordinal, 3);
    assert_eq!(window.items, vec![21, 22, 23, 24, 25]);
    assert!(list.is_exhausted());

    list.jump_to(9).await.unwrap();
    assert!(list.fetch_next().await.unwrap().is_none());
    assert_eq!(source.pages_requested(), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_token_cursors_chain_windows() {
    let source = FakeSource::tokens(30);
    let mut list = PagedList::new(source.clone(), 10);

    list.jump_to(3).await.unwrap();

    let requests = source.requests();
    assert_eq!(requests[0].cursor, None);
    assert_eq!(requests[1].cursor.as_deref(), Some("after-1"));
    assert_eq!(requests[2].cursor.as_deref(), Some("after-2"));

    let windows = list.windows();
    for pair in windows.windows(2) {
      assert!(pair[0].is_followed_by(&pair[1]));
    }
    assert!(list.is_exhausted());
  }

  #[tokio::test]
  async fn test_invalidation_resets_the_list() {
    let source = FakeSource::numbered(45);
    let (tx, rx) = watch::channel(0u64);
    let mut list = PagedList::new(source.clone(), 10).invalidated_by(rx);

    list.jump_to(2).await.unwrap();
    tx.send(1).unwrap();

    let window = list.jump_to(1).await.unwrap().unwrap();
    assert_eq!(window.ordinal, 1);
    assert_eq!(list.fetched(), 1);
    assert_eq!(source.pages_requested(), vec![1, 2, 1]);
  }

  #[tokio::test]
  async fn test_failed_fetch_leaves_list_usable() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);
    source.fail_on(Some(2));

    let err = list.jump_to(3).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::Unavailable));
    assert_eq!(list.fetched(), 1);
    assert_eq!(list.state(), ListState::Idle);

    source.fail_on(None);
    let window = list.jump_to(3).await.unwrap().unwrap();
    assert_eq!(window.ordinal, 3);
    assert_eq!(source.pages_requested(), vec![1, 2, 2, 3]);
  }

  #[tokio::test]
  async fn test_display_range() {
    let source = FakeSource::numbered(25);
    let mut list = PagedList::new(source, 10);
    list.jump_to(3).await.unwrap();

    let second = list.display_range(2).unwrap();
    assert_eq!((second.start, second.end, second.total), (11, 20, Some(25)));
    assert_eq!(list.display_range(3).unwrap().to_string(), "showing 21-25 of 25");
    assert_eq!(list.display_range(4), None);
    assert_eq!(list.page_count(), Some(3));
  }

  #[tokio::test]
  async fn test_total_comes_from_most_recent_page() {
    let source = FakeSource::numbered(25);
    let mut list = PagedList::new(source.clone(), 10);

    list.jump_to(1).await.unwrap();
    assert_eq!(list.total(), Some(25));

    source.set_len(31);
    list.jump_to(2).await.unwrap();
    assert_eq!(list.total(), Some(31));
  }

  #[tokio::test]
  async fn test_refresh_page_replaces_in_place() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);
    list.jump_to(3).await.unwrap();

    let refreshed = list.refresh_page(2).await.unwrap().unwrap();
    assert_eq!(refreshed.ordinal, 2);
    assert_eq!(list.fetched(), 3);
    assert_eq!(source.pages_requested(), vec![1, 2, 3, 2]);
  }

  #[tokio::test]
  async fn test_refresh_page_drops_windows_that_no_longer_follow() {
    let source = FakeSource::numbered(45);
    let mut list = PagedList::new(source.clone(), 10);
    list.jump_to(4).await.unwrap();

    source.set_len(15);
    let refreshed = list.refresh_page(2).await.unwrap().unwrap();
    assert_eq!(refreshed.items, vec![11, 12, 13, 14, 15]);
    assert!(refreshed.is_last());
    assert_eq!(list.fetched(), 2);
    assert!(list.is_exhausted());
  }

  #[tokio::test]
  async fn test_empty_list() {
    let source = FakeSource::numbered(0);
    let mut list = PagedList::new(source, 10);

    let window = list.jump_to(1).await.unwrap().unwrap();
    assert!(window.items.is_empty());
    assert!(list.is_exhausted());
    assert_eq!(list.display_range(1).unwrap().to_string(), "no results");
  }

  #[tokio::test]
  async fn test_into_pages_streams_in_order() {
    let source = FakeSource::numbered(25);
    let list = PagedList::new(source.clone(), 10);

    let ordinals: Vec<usize> = list
      .into_pages()
      .map(|w| w.unwrap().ordinal)
      .collect()
      .await;

    assert_eq!(ordinals, vec![1, 2, 3]);
    assert_eq!(source.0.max_active.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_into_pages_stops_after_error() {
    let source = FakeSource::numbered(45);
    source.fail_on(Some(2));
    let list = PagedList::new(source, 10);

    let results: Vec<_> = list.into_pages().collect().await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
  }

  #[tokio::test]
  async fn test_closures_are_sources() {
    let mut list = PagedList::new(
      |request: PageRequest| async move {
        Ok::<_, ApiError>(Page {
          items: vec![request.page],
          next: (request.page < 2).then(|| PageCursor::Page(request.page + 1)),
          total: Some(2),
        })
      },
      1,
    );

    assert_eq!(list.jump_to(5).await.unwrap().unwrap().items, vec![2]);
    assert_eq!(list.items().copied().collect::<Vec<_>>(), vec![1, 2]);
  }
}
