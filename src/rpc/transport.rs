//! Unary JSON calls over HTTP with the bearer credential attached.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::credentials::CredentialProvider;
use crate::error::{ApiError, Code};

use super::api_types::ApiErrorBody;

/// Fully qualified RPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
  pub service: &'static str,
  pub method: &'static str,
}

impl MethodId {
  pub const fn new(service: &'static str, method: &'static str) -> Self {
    Self { service, method }
  }

  /// `/{service}/{method}`
  pub fn path(&self) -> String {
    format!("/{}/{}", self.service, self.method)
  }
}

impl fmt::Display for MethodId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.service, self.method)
  }
}

/// Something that can perform a unary call.
pub trait Transport: Send + Sync + 'static {
  fn call(
    &self,
    method: MethodId,
    params: Value,
  ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// HTTP transport speaking the Connect unary JSON protocol.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
  base: Url,
  credentials: Arc<dyn CredentialProvider>,
}

impl HttpTransport {
  pub fn new(
    base_url: &str,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Option<Duration>,
  ) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("Failed to parse API url {}: {}", base_url, e))?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let mut builder = reqwest::Client::builder().gzip(true).deflate(true);
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      credentials,
    })
  }

  fn endpoint(&self, method: MethodId) -> Result<Url, ApiError> {
    self
      .base
      .join(&format!("{}/{}", method.service, method.method))
      .map_err(|e| ApiError::Network(format!("invalid endpoint for {}: {}", method, e)))
  }
}

impl Transport for HttpTransport {
  async fn call(&self, method: MethodId, params: Value) -> Result<Value, ApiError> {
    let url = self.endpoint(method)?;

    let mut request = self
      .http
      .post(url)
      .header(CONTENT_TYPE, "application/json")
      .json(&params);
    if let Some(header) = bearer_header(self.credentials.as_ref()) {
      request = request.header(AUTHORIZATION, header);
    }

    debug!(method = %method, "calling");
    let response = request.send().await.map_err(|e| {
      warn!(method = %method, error = %e, "request failed");
      ApiError::Network(e.to_string())
    })?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    if !status.is_success() {
      let err = decode_error(status.as_u16(), &body);
      warn!(method = %method, status = status.as_u16(), error = %err, "call failed");
      return Err(err);
    }

    decode_body(&body)
  }
}

/// `Authorization` header value for the current credential, if any.
pub fn bearer_header(credentials: &dyn CredentialProvider) -> Option<String> {
  credentials
    .token()
    .filter(|t| !t.is_empty())
    .map(|t| format!("Bearer {}", t))
}

fn decode_body(body: &str) -> Result<Value, ApiError> {
  if body.trim().is_empty() {
    return Ok(Value::Object(Default::default()));
  }
  serde_json::from_str(body).map_err(ApiError::decode)
}

/// Turn a non-2xx answer into an error, preferring the code in the body.
pub fn decode_error(status: u16, body: &str) -> ApiError {
  if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
    if let Some(code) = parsed.code.resolve() {
      return ApiError::remote(code, parsed.message);
    }
  }

  let message = if body.trim().is_empty() {
    format!("HTTP {}", status)
  } else {
    body.trim().to_string()
  };
  ApiError::remote(code_for_status(status), message)
}

/// Connect's mapping from HTTP status to code.
fn code_for_status(status: u16) -> Code {
  match status {
    400 => Code::Internal,
    401 => Code::Unauthenticated,
    403 => Code::PermissionDenied,
    404 => Code::Unimplemented,
    429 | 502 | 503 | 504 => Code::Unavailable,
    _ => Code::Unknown,
  }
}
