//! Credential sources for the RPC transport.
//!
//! The transport never reads global state itself: a `CredentialProvider` is
//! handed to it at construction time. The login view and the `logout` command
//! write the token into `LocalStorage`; the transport only reads it.

use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Source of the bearer token attached to outgoing calls.
pub trait CredentialProvider: Send + Sync {
  fn token(&self) -> Option<String>;
}

/// A fixed credential.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(Some(token.into()))
  }
}

impl CredentialProvider for StaticToken {
  fn token(&self) -> Option<String> {
    self.0.clone()
  }
}

/// Persistent string key/value store backed by a JSON file.
pub struct LocalStorage {
  path: PathBuf,
  entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
  /// Open the storage at the default location in the user data directory.
  pub fn open() -> Result<Self> {
    Self::open_at(Self::default_path()?)
  }

  /// Open the storage at an explicit path, creating it lazily on first write.
  pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let entries = if path.exists() {
      let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre!("Failed to read storage {}: {}", path.display(), e))?;
      if contents.trim().is_empty() {
        BTreeMap::new()
      } else {
        serde_json::from_str(&contents)
          .map_err(|e| eyre!("Failed to parse storage {}: {}", path.display(), e))?
      }
    } else {
      BTreeMap::new()
    };

    Ok(Self {
      path,
      entries: Mutex::new(entries),
    })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("shopnexus").join("storage.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn get(&self, key: &str) -> Option<String> {
    self
      .entries
      .lock()
      .ok()
      .and_then(|entries| entries.get(key).cloned())
  }

  pub fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    self.flush(&entries)
  }

  pub fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    if entries.remove(key).is_some() {
      self.flush(&entries)?;
    }
    Ok(())
  }

  fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let data = serde_json::to_vec_pretty(entries)
      .map_err(|e| eyre!("Failed to serialize storage: {}", e))?;
    std::fs::write(&self.path, data)
      .map_err(|e| eyre!("Failed to write storage {}: {}", self.path.display(), e))
  }
}

impl CredentialProvider for LocalStorage {
  fn token(&self) -> Option<String> {
    self.get(TOKEN_KEY).filter(|t| !t.is_empty())
  }
}
