//! Configuration loading for pager-cli.
//!
//! Configuration is read from a TOML file given with `--config`. Every
//! field has a default, so an empty file (or no file at all) is valid.

use pager_client::{InitialRefresh, PagerConfig};
use pager_types::PageNumber;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for pager-cli.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Items API settings.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Local cache settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Paging behaviour.
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Items API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the API; pages are fetched from `<base_url>items/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. Relative paths are resolved against the data
    /// directory.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Paging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    /// Items per network page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Distance from a window edge that triggers a load (default: page size).
    pub prefetch_distance: Option<usize>,
    /// Items materialized when a stream opens (default: 3 pages).
    pub initial_load_size: Option<usize>,
    /// First network page number (default: 1).
    #[serde(default = "default_starting_page")]
    pub starting_page: u32,
    /// `launch` or `skip` (default: launch).
    #[serde(default)]
    pub initial_refresh: InitialRefresh,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_database_path() -> PathBuf {
    PathBuf::from("items.db")
}

fn default_page_size() -> usize {
    20
}

fn default_starting_page() -> u32 {
    1
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            prefetch_distance: None,
            initial_load_size: None,
            starting_page: default_starting_page(),
            initial_refresh: InitialRefresh::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if given, else use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Absolute database path for a data directory.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            data_dir.join(&self.storage.database)
        }
    }

    /// Request timeout for the HTTP fetcher.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Pager settings derived from the `[paging]` table.
    pub fn pager_config(&self) -> PagerConfig {
        let paging = &self.paging;
        let mut config = PagerConfig::new()
            .with_page_size(paging.page_size)
            .with_starting_page(PageNumber::new(paging.starting_page))
            .with_initial_refresh(paging.initial_refresh);
        if let Some(distance) = paging.prefetch_distance {
            config = config.with_prefetch_distance(distance);
        }
        if let Some(size) = paging.initial_load_size {
            config = config.with_initial_load_size(size);
        }
        config
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
