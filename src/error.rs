//! Error taxonomy for calls against the ShopNexus RPC API.

use std::fmt;

/// RPC status codes as reported by the server.
///
/// Numbering follows the gRPC/Connect convention, so `Unauthenticated` is 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
  Canceled,
  Unknown,
  InvalidArgument,
  DeadlineExceeded,
  NotFound,
  AlreadyExists,
  PermissionDenied,
  ResourceExhausted,
  FailedPrecondition,
  Aborted,
  OutOfRange,
  Unimplemented,
  Internal,
  Unavailable,
  DataLoss,
  Unauthenticated,
}

const CODES: &[(Code, u32, &str)] = &[
  (Code::Canceled, 1, "canceled"),
  (Code::Unknown, 2, "unknown"),
  (Code::InvalidArgument, 3, "invalid_argument"),
  (Code::DeadlineExceeded, 4, "deadline_exceeded"),
  (Code::NotFound, 5, "not_found"),
  (Code::AlreadyExists, 6, "already_exists"),
  (Code::PermissionDenied, 7, "permission_denied"),
  (Code::ResourceExhausted, 8, "resource_exhausted"),
  (Code::FailedPrecondition, 9, "failed_precondition"),
  (Code::Aborted, 10, "aborted"),
  (Code::OutOfRange, 11, "out_of_range"),
  (Code::Unimplemented, 12, "unimplemented"),
  (Code::Internal, 13, "internal"),
  (Code::Unavailable, 14, "unavailable"),
  (Code::DataLoss, 15, "data_loss"),
  (Code::Unauthenticated, 16, "unauthenticated"),
];

impl Code {
  /// Look up a code by its numeric value.
  pub fn from_u32(value: u32) -> Option<Self> {
    CODES
      .iter()
      .find(|(_, n, _)| *n == value)
      .map(|(code, _, _)| *code)
  }

  /// Look up a code by its wire name (e.g. `"unauthenticated"`).
  pub fn from_name(name: &str) -> Option<Self> {
    let name = name.trim().to_ascii_lowercase();
    CODES
      .iter()
      .find(|(_, _, n)| *n == name)
      .map(|(code, _, _)| *code)
  }

  pub fn as_u32(self) -> u32 {
    self.entry().1
  }

  pub fn name(self) -> &'static str {
    self.entry().2
  }

  fn entry(self) -> &'static (Code, u32, &'static str) {
    // Every variant has a row in CODES.
    CODES
      .iter()
      .find(|(code, _, _)| *code == self)
      .unwrap_or(&CODES[1])
  }
}

impl fmt::Display for Code {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Errors returned by the transport, cache store and pagination layers.
///
/// `Clone` so a single failed fetch can be handed to every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
  /// The server answered with an error status.
  #[error("{code}: {message}")]
  Remote { code: Code, message: String },
  /// The request never produced a server answer (unreachable host, timeout, ...).
  #[error("network error: {0}")]
  Network(String),
  /// The response did not have the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl ApiError {
  pub fn remote(code: Code, message: impl Into<String>) -> Self {
    Self::Remote {
      code,
      message: message.into(),
    }
  }

  pub fn unauthenticated(message: impl Into<String>) -> Self {
    Self::remote(Code::Unauthenticated, message)
  }

  pub fn decode(err: impl fmt::Display) -> Self {
    Self::Decode(err.to_string())
  }

  /// The server-reported code, if the server answered at all.
  pub fn code(&self) -> Option<Code> {
    match self {
      Self::Remote { code, .. } => Some(*code),
      _ => None,
    }
  }

  /// True when the caller's credential was missing, expired or invalid.
  pub fn is_unauthenticated(&self) -> bool {
    self.code() == Some(Code::Unauthenticated)
  }
}
