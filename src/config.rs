use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::StoreOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub paging: PagingConfig,
  /// Location opened at startup (defaults to the catalog)
  #[serde(default = "default_start_path")]
  pub start_path: String,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
}

fn default_start_path() -> String {
  "/products".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Request timeout; none unless set
  pub timeout_secs: Option<u64>,
}

impl ApiConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_secs.map(Duration::from_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, results are not memoized; identical concurrent reads still share a call
  pub enabled: bool,
  pub stale_secs: u64,
  pub retention_secs: u64,
  pub refetch_on_focus: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    let defaults = StoreOptions::default();
    Self {
      enabled: true,
      stale_secs: defaults.stale_time.as_secs(),
      retention_secs: defaults.retention.as_secs(),
      refetch_on_focus: defaults.refetch_on_focus,
    }
  }
}

impl CacheConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      stale_time: Duration::from_secs(self.stale_secs),
      retention: Duration::from_secs(self.retention_secs),
      refetch_on_focus: self.refetch_on_focus,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
  pub page_size: u32,
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self { page_size: 20 }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shopnexus.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shopnexus/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create ./shopnexus.yaml or \
         ~/.config/shopnexus/config.yaml (config.example.yaml shows the format)"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("shopnexus.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shopnexus").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    if config.paging.page_size == 0 {
      return Err(eyre!("paging.page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Get a session token from the environment.
  ///
  /// Checks SHOPNEXUS_TOKEN.
  pub fn token_from_env() -> Option<String> {
    std::env::var("SHOPNEXUS_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
