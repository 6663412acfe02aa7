//! Configuration management for launchline
//!
//! Catalog location and query limits, session defaults and logging level.
//! See [`loader`] for where configuration files are looked up.

pub mod loader;

pub use loader::{ConfigFormat, ConfigLoader, LoadOptions};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::{DEFAULT_FETCH_BATCH_SIZE, DEFAULT_SUGGESTION_LIMIT};
use crate::dispatcher::DEFAULT_TOGGLE_TOKEN;

/// Main configuration structure for launchline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command catalog configuration
    pub catalog: CatalogConfig,

    /// Search session configuration
    pub session: SessionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Command catalog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file
    pub path: PathBuf,

    /// Maximum number of name suggestions
    pub suggestion_limit: usize,

    /// Names per batched step lookup
    pub fetch_batch_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
        }
    }
}

/// Search session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Input that toggles restricted visibility
    pub toggle_token: String,

    /// Show restricted commands from the start
    pub allow_restricted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            toggle_token: DEFAULT_TOGGLE_TOKEN.to_string(),
            allow_restricted: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `<data dir>/launchline/plugins.db`, or `./launchline/plugins.db` without one
pub fn default_catalog_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("launchline")
        .join("plugins.db")
}
