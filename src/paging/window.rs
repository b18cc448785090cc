use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::ApiError;

/// Where a page begins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageCursor {
  /// Beginning of the list
  Start,
  /// Page-number based endpoints
  Page(u32),
  /// Opaque continuation token issued by the server
  Token(String),
}

impl PageCursor {
  /// Request for the page at `ordinal` (1-based) that begins at this cursor.
  pub fn request(&self, ordinal: u32, limit: u32) -> PageRequest {
    match self {
      PageCursor::Start => PageRequest::first(limit),
      PageCursor::Page(page) => PageRequest::number(*page, limit),
      PageCursor::Token(token) => PageRequest {
        page: ordinal,
        limit,
        cursor: Some(token.clone()),
      },
    }
  }
}

/// Parameters of one paginated call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
  pub page: u32,
  pub limit: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cursor: Option<String>,
}

impl PageRequest {
  pub fn first(limit: u32) -> Self {
    Self::number(1, limit)
  }

  pub fn number(page: u32, limit: u32) -> Self {
    Self {
      page: page.max(1),
      limit,
      cursor: None,
    }
  }
}

/// One page as returned by an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Where the following page begins; `None` on the last page
  pub next: Option<PageCursor>,
  /// Server-reported size of the whole list
  pub total: Option<u64>,
}

/// One fetched page at its position in a stitched list.
///
/// Never mutated; a re-fetch replaces it with a new window at the same ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow<T> {
  /// 1-based position in the list
  pub ordinal: usize,
  /// Cursor the page was requested with
  pub cursor: PageCursor,
  pub items: Vec<T>,
  /// Trailing cursor, equal to the next window's `cursor`
  pub next: Option<PageCursor>,
  pub total: Option<u64>,
}

impl<T> PageWindow<T> {
  pub fn is_last(&self) -> bool {
    self.next.is_none()
  }

  /// True when `other` is the window that directly follows this one.
  pub fn is_followed_by(&self, other: &PageWindow<T>) -> bool {
    other.ordinal == self.ordinal + 1 && self.next.as_ref() == Some(&other.cursor)
  }
}

/// Something that can fetch one page of a list.
///
/// Any `Fn(PageRequest) -> impl Future<Output = Result<Page<T>, ApiError>>` is a source.
pub trait PageSource<T>: Send + Sync {
  fn fetch_page(
    &self,
    request: PageRequest,
  ) -> impl Future<Output = Result<Page<T>, ApiError>> + Send;
}

impl<T, F, Fut> PageSource<T> for F
where
  F: Fn(PageRequest) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Page<T>, ApiError>> + Send,
{
  fn fetch_page(
    &self,
    request: PageRequest,
  ) -> impl Future<Output = Result<Page<T>, ApiError>> + Send {
    self(request)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cursor_requests() {
    assert_eq!(PageCursor::Start.request(1, 20), PageRequest::first(20));
    assert_eq!(PageCursor::Page(3).request(3, 20), PageRequest::number(3, 20));
    assert_eq!(
      PageCursor::Token("abc".into()).request(4, 20),
      PageRequest {
        page: 4,
        limit: 20,
        cursor: Some("abc".into()),
      }
    );
  }

  #[test]
  fn test_page_zero_is_clamped() {
    assert_eq!(PageRequest::number(0, 10).page, 1);
  }

  #[test]
  fn test_is_followed_by() {
    let first = PageWindow {
      ordinal: 1,
      cursor: PageCursor::Start,
      items: vec![1, 2],
      next: Some(PageCursor::Token("t".into())),
      total: None,
    };
    let second = PageWindow {
      ordinal: 2,
      cursor: PageCursor::Token("t".into()),
      items: vec![3],
      next: None,
      total: None,
    };
    assert!(first.is_followed_by(&second));
    assert!(!second.is_followed_by(&first));
    assert!(second.is_last());
  }
}
