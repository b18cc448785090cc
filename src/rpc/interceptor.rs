//! Store-wide handling of unauthenticated failures.

use std::sync::Arc;

use tracing::info;

use crate::cache::{ErrorHook, Operation};
use crate::error::ApiError;
use crate::route::{redirect_target, Navigator};

/// Sends the user to the right login page when a call comes back unauthenticated.
///
/// Other errors pass through untouched; the caller renders them.
pub struct AuthRedirect {
  navigator: Arc<dyn Navigator>,
}

impl AuthRedirect {
  pub fn new(navigator: Arc<dyn Navigator>) -> Self {
    Self { navigator }
  }
}

impl ErrorHook for AuthRedirect {
  fn on_error(&self, operation: Operation, error: &ApiError) {
    if !error.is_unauthenticated() {
      return;
    }

    let path = self.navigator.current_path();
    if let Some(target) = redirect_target(operation, &path) {
      info!(from = %path, to = target, ?operation, "unauthenticated, redirecting");
      self.navigator.redirect(target);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Code;
  use crate::route::{ADMIN_LOGIN_PATH, LOGIN_PATH};
  use std::sync::Mutex;

  #[derive(Default)]
  struct RecordingNavigator {
    path: Mutex<String>,
    redirects: Mutex<Vec<String>>,
  }

  impl RecordingNavigator {
    fn at(path: &str) -> Arc<Self> {
      Arc::new(Self {
        path: Mutex::new(path.to_string()),
        redirects: Mutex::new(Vec::new()),
      })
    }

    fn redirects(&self) -> Vec<String> {
      self.redirects.lock().unwrap().clone()
    }
  }

  impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
      self.path.lock().unwrap().clone()
    }

    fn redirect(&self, path: &str) {
      *self.path.lock().unwrap() = path.to_string();
      self.redirects.lock().unwrap().push(path.to_string());
    }
  }

  #[test]
  fn test_admin_query_redirects_to_admin_login() {
    let nav = RecordingNavigator::at("/admin/sales");
    let hook = AuthRedirect::new(nav.clone());

    hook.on_error(Operation::Query, &ApiError::unauthenticated("expired"));

    assert_eq!(nav.redirects(), vec![ADMIN_LOGIN_PATH.to_string()]);
  }

  #[test]
  fn test_storefront_query_does_not_redirect() {
    let nav = RecordingNavigator::at("/products");
    let hook = AuthRedirect::new(nav.clone());

    hook.on_error(Operation::Query, &ApiError::unauthenticated("expired"));

    assert!(nav.redirects().is_empty());
  }

  #[test]
  fn test_storefront_mutation_redirects_to_login() {
    let nav = RecordingNavigator::at("/products/3");
    let hook = AuthRedirect::new(nav.clone());

    hook.on_error(Operation::Mutation, &ApiError::unauthenticated("expired"));

    assert_eq!(nav.redirects(), vec![LOGIN_PATH.to_string()]);
  }

  #[test]
  fn test_other_errors_are_ignored() {
    let nav = RecordingNavigator::at("/admin/products");
    let hook = AuthRedirect::new(nav.clone());

    hook.on_error(
      Operation::Mutation,
      &ApiError::remote(Code::PermissionDenied, "nope"),
    );
    hook.on_error(Operation::Query, &ApiError::Network("refused".into()));

    assert!(nav.redirects().is_empty());
  }

  #[test]
  fn test_no_redirect_loop_on_login_page() {
    let nav = RecordingNavigator::at(ADMIN_LOGIN_PATH);
    let hook = AuthRedirect::new(nav.clone());

    hook.on_error(Operation::Mutation, &ApiError::unauthenticated("bad token"));

    assert!(nav.redirects().is_empty());
  }
}
