//! Catalog Command Model
//!
//! A row of the persisted command catalog. Entries are either terminal
//! (backed by an executable) or composite (an ordered list of links).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Visibility label of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Always listed
    #[default]
    #[serde(alias = "sfw")]
    Public,
    /// Listed only after the session opts in
    #[serde(alias = "nsfw")]
    Restricted,
}

impl Visibility {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Restricted => "restricted",
        }
    }

    /// Parse the storage representation (legacy labels accepted)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "public" | "sfw" => Ok(Visibility::Public),
            "restricted" | "nsfw" => Ok(Visibility::Restricted),
            other => Err(Error::Storage {
                reason: format!("unknown visibility '{}'", other),
            }),
        }
    }

    /// Whether an entry with this label is visible in the given mode
    pub fn visible(&self, allow_restricted: bool) -> bool {
        allow_restricted || *self == Visibility::Public
    }
}

/// How a catalog entry is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    /// Backed directly by an executable or script
    #[serde(alias = "raw")]
    Terminal,
    /// Ordered list of links to other commands
    #[serde(alias = "proxy")]
    Composite,
}

impl CommandMode {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandMode::Terminal => "terminal",
            CommandMode::Composite => "composite",
        }
    }

    /// Parse the storage representation (legacy names accepted)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "terminal" | "raw" => Ok(CommandMode::Terminal),
            "composite" | "proxy" => Ok(CommandMode::Composite),
            other => Err(Error::Storage {
                reason: format!("unknown command mode '{}'", other),
            }),
        }
    }
}

/// A catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Unique name the user types
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Visibility label
    pub visibility: Visibility,
    /// Pinned entries sort first
    pub starred: bool,
    /// Number of times the entry was launched
    pub use_count: i64,
    /// Terminal or composite
    pub mode: CommandMode,
}

impl CommandEntry {
    /// Create a public, unstarred entry
    pub fn new(name: impl Into<String>, mode: CommandMode) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            visibility: Visibility::Public,
            starred: false,
            use_count: 0,
            mode,
        }
    }

    /// Builder-style description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Whether the entry expands into links
    pub fn is_composite(&self) -> bool {
        self.mode == CommandMode::Composite
    }
}
