use crate::error::ApiError;

/// Kind of operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  /// Read through `QueryStore::query`
  Query,
  /// Write through `QueryStore::mutate`
  Mutation,
}

/// Store-wide error handler.
///
/// Registered once when the store is built and called for every failed query
/// and mutation before the error is returned to the caller.
pub trait ErrorHook: Send + Sync {
  fn on_error(&self, operation: Operation, error: &ApiError);
}
