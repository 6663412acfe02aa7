//! launchline - type a short name, run a command chain
//!
//! This library resolves names from a persisted command catalog into ordered
//! chains of external steps and drives those chains through a pause/resume
//! execution engine.
//!
//! ## Module Organization
//!
//! - [`catalog`] - SQLite command catalog and plugin registration
//! - [`resolver`] - Name suggestions and composite flattening
//! - [`execution`] - Execution engine, process adapter, step reports
//! - [`dispatcher`] - Search / active role arbitration for a front end
//! - [`models`] - Catalog rows, step configs, control signals
//! - [`config`] - Configuration loading
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use launchline::{build_dispatcher, init};
//!
//! # async fn run() -> launchline::Result<()> {
//! let config = init()?;
//! let mut dispatcher = build_dispatcher(&config)?;
//!
//! let outcome = dispatcher.on_select("open-site").await;
//! println!("{}", outcome.signal);
//! if let Some(first) = dispatcher.wait_background().await {
//!     println!("{}", first.signal);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A single foreground task drives the [`Dispatcher`]. Selecting a name in
//! search spawns one tokio task that runs the chain to its first pause or end
//! and reports back over a one-shot channel. Cancellation is a flag checked
//! between steps; a running external process is never killed.

#[macro_use]
extern crate tracing;

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod models;
pub mod resolver;

use std::path::Path;
use std::sync::Arc;

// Re-exports for core functionality
pub use catalog::{CommandCatalog, SqliteCatalog};
pub use config::{Config, ConfigLoader};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use execution::{ExecutionEngine, ProcessRunner, StepRunner};
pub use models::{ControlSignal, Directive, Outcome, UiAction};
pub use resolver::Resolver;

// Version information
/// The current version of launchline from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Load configuration from the default locations, falling back to defaults
pub fn init() -> Result<Config> {
    info!("Initializing {} v{}", NAME, VERSION);

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            Config::default()
        }
    };

    Ok(config)
}

/// Load configuration from one explicit file
pub fn init_with_config(config_path: &Path) -> Result<Config> {
    info!(
        "Initializing {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );

    ConfigLoader::load_from_path(config_path).map_err(|e| {
        error!(
            "Failed to load configuration from {}: {}",
            config_path.display(),
            e
        );
        e
    })
}

/// Open (creating if needed) the catalog named by `config`
pub fn open_catalog(config: &Config) -> Result<SqliteCatalog> {
    let catalog = SqliteCatalog::open(&config.catalog.path)?;
    debug!("Catalog opened at {}", config.catalog.path.display());
    Ok(catalog)
}

/// Wire catalog, resolver, process runner and dispatcher from `config`
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let catalog: Arc<dyn CommandCatalog> = Arc::new(open_catalog(config)?);
    Ok(dispatcher_for(catalog, Arc::new(ProcessRunner::new()), config))
}

/// Wire a dispatcher over an existing catalog and runner
pub fn dispatcher_for(
    catalog: Arc<dyn CommandCatalog>,
    runner: Arc<dyn StepRunner>,
    config: &Config,
) -> Dispatcher {
    let resolver = Resolver::new(catalog).with_limits(
        config.catalog.suggestion_limit,
        config.catalog.fetch_batch_size,
    );

    Dispatcher::new(Arc::new(resolver), runner)
        .with_toggle_token(config.session.toggle_token.clone())
        .with_allow_restricted(config.session.allow_restricted)
}

/// Human readable explanation of a startup failure
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ConfigParseFailed { format, reason } => {
            format!(
                "Configuration Error: Failed to parse {} config: {}\n\nTry:\n• Check configuration file syntax\n• Use default configuration",
                format, reason
            )
        }
        Error::ConfigValidationFailed { field, reason } => {
            format!(
                "Configuration Error: Validation failed for '{}': {}\n\nTry:\n• Check configuration value\n• Use default configuration",
                field, reason
            )
        }
        Error::ConfigNotFound => {
            "Configuration Error: Config file not found\n\nTry:\n• Check the path passed to --config\n• Use default configuration".to_string()
        }
        Error::Storage { reason } => {
            format!(
                "Catalog Error: {}\n\nTry:\n• Check the catalog path and its permissions\n• Run `launchline init-db`",
                reason
            )
        }
        Error::Io(err) => {
            format!(
                "I/O Error: {}\n\nTry:\n• Check file permissions\n• Ensure required directories exist",
                err
            )
        }
        _ => format!("Unexpected Error: {}", error),
    }
}
