//! Persisted command catalog
//!
//! The resolver only talks to the catalog through [`CommandCatalog`], which
//! captures the query contracts the store must satisfy. [`SqliteCatalog`] is
//! the embedded implementation; [`manifest`] registers plugin folders into it.

pub mod manifest;
pub mod sqlite;

pub use manifest::{register_plugin, PluginManifest};
pub use sqlite::SqliteCatalog;

use crate::error::Result;
use crate::models::{CommandEntry, CommandLink, StepConfig};

/// Default cap on name suggestions
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Default number of names per batched step lookup
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 20;

/// Query contracts of the command catalog
///
/// Implementations must allow at most one query in flight per connection
/// handle; callers may share one catalog across threads.
pub trait CommandCatalog: Send + Sync {
    /// Names containing `pattern`, starred first then by use count, at most `limit`
    fn search(&self, pattern: &str, allow_restricted: bool, limit: usize) -> Result<Vec<String>>;

    /// One entry by exact name, `None` when absent or hidden
    fn entry(&self, name: &str, allow_restricted: bool) -> Result<Option<CommandEntry>>;

    /// Links of a composite in `order_index` order
    fn links(&self, parent: &str) -> Result<Vec<CommandLink>>;

    /// Step rows for the given terminal names; hidden or unknown names are skipped
    fn fetch_steps(&self, names: &[String], allow_restricted: bool) -> Result<Vec<StepConfig>>;

    /// Bump the launch counter; `false` when no such entry exists
    fn increment_usage(&self, name: &str) -> Result<bool>;
}
