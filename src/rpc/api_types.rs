//! Serde types matching the RPC wire format.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Deserializer};

use crate::error::Code;
use crate::paging::{Page, PageCursor};

// ============================================================================
// 64-bit integers (the JSON mapping encodes them as strings)
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
  Number(u64),
  String(String),
}

/// Deserialize a u64 that may arrive as a JSON number or a decimal string.
pub fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(de_opt_u64(deserializer)?.unwrap_or_default())
}

/// Like `de_u64`, but `null` and `""` become `None`.
pub fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<NumberOrString>::deserialize(deserializer)? {
    None => Ok(None),
    Some(NumberOrString::Number(n)) => Ok(Some(n)),
    Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
    Some(NumberOrString::String(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(serde::de::Error::custom),
  }
}

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorCode {
  Number(u32),
  Name(String),
}

impl ApiErrorCode {
  pub fn resolve(&self) -> Option<Code> {
    match self {
      ApiErrorCode::Number(n) => Code::from_u32(*n),
      ApiErrorCode::Name(name) => Code::from_name(name),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub code: ApiErrorCode,
  #[serde(default)]
  pub message: String,
}

// ============================================================================
// Paginated list responses
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPagination {
  #[serde(default, deserialize_with = "de_opt_u64")]
  pub total: Option<u64>,
  #[serde(default, deserialize_with = "de_opt_u64")]
  pub next_page: Option<u64>,
  #[serde(default)]
  pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListResponse<T> {
  #[serde(default = "Vec::new")]
  pub data: Vec<T>,
  #[serde(default)]
  pub pagination: Option<ApiPagination>,
}

impl<T> ApiListResponse<T> {
  /// Normalize to a page. A cursor token wins over a next page number.
  pub fn into_page(self) -> Page<T> {
    let pagination = self.pagination.unwrap_or_default();

    let token = pagination.next_cursor.filter(|c| !c.is_empty());
    let next = match (token, pagination.next_page) {
      (Some(token), _) => Some(PageCursor::Token(token)),
      (None, Some(page)) if page > 0 => u32::try_from(page).ok().map(PageCursor::Page),
      _ => None,
    };

    Page {
      items: self.data,
      next,
      total: pagination.total,
    }
  }
}
