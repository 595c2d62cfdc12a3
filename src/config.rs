use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::notify::NotificationTemplate;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin the worker serves; relative paths resolve against it
  pub origin: Url,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub orders: OrdersConfig,
  #[serde(default)]
  pub notifications: NotificationsConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Current cache generation; bump on every deployment that changes assets
  #[serde(default = "default_generation")]
  pub generation: String,
  /// Paths preloaded at install time
  #[serde(default = "default_manifest")]
  pub manifest: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      generation: default_generation(),
      manifest: default_manifest(),
    }
  }
}

fn default_generation() -> String {
  "plsss.vip".to_string()
}

fn default_manifest() -> Vec<String> {
  [
    "/",
    "/android-chrome-192x192.png",
    "/android-chrome-512x512.png",
    "/apple-touch-icon.png",
    "/favicon.ico",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
  /// Order submission endpoint
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  /// Sync tag that triggers a drain of pending orders
  #[serde(default = "default_sync_tag")]
  pub sync_tag: String,
}

impl Default for OrdersConfig {
  fn default() -> Self {
    Self {
      endpoint: default_endpoint(),
      sync_tag: default_sync_tag(),
    }
  }
}

fn default_endpoint() -> String {
  "/api/orders".to_string()
}

fn default_sync_tag() -> String {
  "background-sync-orders".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
  #[serde(default = "default_title")]
  pub title: String,
  /// Body used when a push carries no payload
  #[serde(default = "default_body")]
  pub default_body: String,
  #[serde(default = "default_icon")]
  pub icon: String,
  #[serde(default = "default_icon")]
  pub badge: String,
  #[serde(default = "default_vibrate")]
  pub vibrate: Vec<u32>,
}

impl Default for NotificationsConfig {
  fn default() -> Self {
    Self {
      title: default_title(),
      default_body: default_body(),
      icon: default_icon(),
      badge: default_icon(),
      vibrate: default_vibrate(),
    }
  }
}

fn default_title() -> String {
  "PLSSS Shopping App".to_string()
}

fn default_body() -> String {
  "New notification from PLSSS Shopping App".to_string()
}

fn default_icon() -> String {
  "/android-chrome-192x192.png".to_string()
}

fn default_vibrate() -> Vec<u32> {
  vec![100, 50, 100]
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
  /// Upper bound on a whole request, body included
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_connect_timeout_secs")]
  pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      timeout_secs: default_timeout_secs(),
      connect_timeout_secs: default_connect_timeout_secs(),
    }
  }
}

impl NetworkConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.connect_timeout_secs)
  }
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_connect_timeout_secs() -> u64 {
  10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite database path (defaults to the user data directory)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive, overridden by RUST_LOG
  #[serde(default = "default_level")]
  pub level: String,
  /// Write a daily rolling log file here in addition to stderr
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_level(),
      directory: None,
    }
  }
}

fn default_level() -> String {
  "info".to_string()
}

/// Explicit configuration handed to each worker component.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  pub origin: Url,
  pub generation: String,
  /// Manifest paths resolved against the origin
  pub manifest: Vec<Url>,
  pub orders_endpoint: Url,
  pub sync_tag: String,
  pub notification: NotificationTemplate,
}

impl WorkerSettings {
  /// URL of the offline shell served for failed navigations.
  pub fn root_document(&self) -> Url {
    let mut root = self.origin.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storefront-offline.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront-offline/config.yaml
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
        "No configuration file found. Create one at ~/.config/storefront-offline/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storefront-offline.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront-offline").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Resolve paths against the origin and build the worker settings.
  pub fn settings(&self) -> Result<WorkerSettings> {
    let resolve = |path: &str| {
      self
        .origin
        .join(path)
        .map_err(|e| eyre!("Invalid path '{}' for origin {}: {}", path, self.origin, e))
    };

    let manifest = self
      .cache
      .manifest
      .iter()
      .map(|p| resolve(p))
      .collect::<Result<Vec<_>>>()?;

    let n = &self.notifications;
    Ok(WorkerSettings {
      origin: self.origin.clone(),
      generation: self.cache.generation.clone(),
      manifest,
      orders_endpoint: resolve(&self.orders.endpoint)?,
      sync_tag: self.orders.sync_tag.clone(),
      notification: NotificationTemplate {
        title: n.title.clone(),
        default_body: n.default_body.clone(),
        icon: n.icon.clone(),
        badge: n.badge.clone(),
        vibrate: n.vibrate.clone(),
      },
    })
  }
}
