//! Client-side locations and the unauthenticated redirect policy.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::Operation;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin-login";
pub const ADMIN_PREFIX: &str = "/admin";

/// True for `/admin` and anything below it. `/admin-login` is not part of the admin section.
pub fn is_admin_path(path: &str) -> bool {
  match path.strip_prefix(ADMIN_PREFIX) {
    Some(rest) => rest.is_empty() || rest.starts_with('/'),
    None => false,
  }
}

pub fn is_login_path(path: &str) -> bool {
  path == LOGIN_PATH || path == ADMIN_LOGIN_PATH
}

/// Where to send the user after an unauthenticated failure, if anywhere.
///
/// Reads outside the admin section are left to the view (it shows the guest
/// state); writes always demand a login.
pub fn redirect_target(operation: Operation, path: &str) -> Option<&'static str> {
  if is_login_path(path) {
    return None;
  }

  if is_admin_path(path) {
    return Some(ADMIN_LOGIN_PATH);
  }

  match operation {
    Operation::Query => None,
    Operation::Mutation => Some(LOGIN_PATH),
  }
}

/// Every screen the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Catalog,
  ProductDetail { id: String },
  Cart,
  Login,
  AdminLogin,
  AdminProducts,
  AdminProductModels,
  AdminComments,
  AdminTags,
  AdminSales,
}

impl Route {
  pub fn parse(path: &str) -> Option<Self> {
    let path = path.trim();
    let path = if path.len() > 1 {
      path.trim_end_matches('/')
    } else {
      path
    };

    let route = match path {
      "/" | "/products" => Route::Catalog,
      "/cart" => Route::Cart,
      LOGIN_PATH => Route::Login,
      ADMIN_LOGIN_PATH => Route::AdminLogin,
      "/admin" | "/admin/products" => Route::AdminProducts,
      "/admin/product-models" => Route::AdminProductModels,
      "/admin/comments" => Route::AdminComments,
      "/admin/tags" => Route::AdminTags,
      "/admin/sales" => Route::AdminSales,
      other => {
        let id = other.strip_prefix("/products/")?;
        if id.is_empty() || id.contains('/') {
          return None;
        }
        Route::ProductDetail { id: id.to_string() }
      }
    };

    Some(route)
  }

  pub fn path(&self) -> String {
    match self {
      Route::Catalog => "/products".to_string(),
      Route::ProductDetail { id } => format!("/products/{}", id),
      Route::Cart => "/cart".to_string(),
      Route::Login => LOGIN_PATH.to_string(),
      Route::AdminLogin => ADMIN_LOGIN_PATH.to_string(),
      Route::AdminProducts => "/admin/products".to_string(),
      Route::AdminProductModels => "/admin/product-models".to_string(),
      Route::AdminComments => "/admin/comments".to_string(),
      Route::AdminTags => "/admin/tags".to_string(),
      Route::AdminSales => "/admin/sales".to_string(),
    }
  }

  /// The route a successful login on this screen leads to.
  pub fn after_login(&self) -> Route {
    match self {
      Route::AdminLogin => Route::AdminProducts,
      _ => Route::Catalog,
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path())
  }
}

/// Access to the current location and hard navigation.
pub trait Navigator: Send + Sync {
  fn current_path(&self) -> String;

  /// Full navigation: everything held in memory is discarded.
  fn redirect(&self, path: &str);
}

#[derive(Debug, Default)]
struct LocationState {
  path: String,
  pending_redirect: Option<String>,
}

/// Shared current location.
///
/// Soft navigation only updates the path. A redirect also queues a hard
/// reload that the app loop picks up with `take_redirect`.
#[derive(Debug, Clone, Default)]
pub struct Location {
  state: Arc<Mutex<LocationState>>,
}

impl Location {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      state: Arc::new(Mutex::new(LocationState {
        path: path.into(),
        pending_redirect: None,
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, LocationState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn set_path(&self, path: impl Into<String>) {
    self.lock().path = path.into();
  }

  pub fn take_redirect(&self) -> Option<String> {
    self.lock().pending_redirect.take()
  }
}

impl Navigator for Location {
  fn current_path(&self) -> String {
    self.lock().path.clone()
  }

  fn redirect(&self, path: &str) {
    let mut state = self.lock();
    state.path = path.to_string();
    state.pending_redirect = Some(path.to_string());
  }
}
