//! Step Configuration Model
//!
//! Execution parameters of a terminal command, the per-link overrides a
//! composite applies to its children, and the resolved step queue.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::command::Visibility;

/// Execution parameters of one terminal command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Catalog name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Visibility label
    pub visibility: Visibility,
    /// Pinned in the catalog
    pub starred: bool,
    /// Launch counter
    pub use_count: i64,
    /// Pause for user input before running
    pub waitable: bool,
    /// Run through a separate interpreter
    pub has_executor: bool,
    /// Interpreter or launcher binary
    pub executor_path: Option<String>,
    /// Script or binary to run
    pub target_path: String,
    /// Supports `-I` suggestion queries and `-S` structured runs
    pub supports_incremental_query: bool,
    /// Argument for the next invocation; rewritten while a chain runs
    pub preset_input: String,
}

impl StepConfig {
    /// Create a step that runs `target_path` directly
    pub fn new(name: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            visibility: Visibility::Public,
            starred: false,
            use_count: 0,
            waitable: false,
            has_executor: false,
            executor_path: None,
            target_path: target_path.into(),
            supports_incremental_query: false,
            preset_input: String::new(),
        }
    }

    /// Builder-style interpreter
    pub fn with_executor(mut self, executor_path: impl Into<String>) -> Self {
        self.has_executor = true;
        self.executor_path = Some(executor_path.into());
        self
    }

    /// Builder-style waitable flag
    pub fn waitable(mut self, waitable: bool) -> Self {
        self.waitable = waitable;
        self
    }

    /// Builder-style associatable flag
    pub fn associatable(mut self, associatable: bool) -> Self {
        self.supports_incremental_query = associatable;
        self
    }

    /// Builder-style preset input
    pub fn with_preset_input(mut self, input: impl Into<String>) -> Self {
        self.preset_input = input.into();
        self
    }

    /// Alias used throughout the engine: the step accepts follow-up input
    pub fn is_associatable(&self) -> bool {
        self.supports_incremental_query
    }
}

/// Override carried by a composite -> child edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOverride {
    /// Position of the child in the parent's list
    pub order_index: i64,
    /// AND-combined with the child's own `waitable`
    pub waitable_override: bool,
    /// Replaces the child's `preset_input` when set
    pub preset_input_override: Option<String>,
}

impl Default for LinkOverride {
    fn default() -> Self {
        Self {
            order_index: 0,
            waitable_override: true,
            preset_input_override: None,
        }
    }
}

/// A composite -> child edge as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLink {
    /// Composite that owns the link
    pub parent: String,
    /// Linked command name
    pub child: String,
    /// Per-link overrides
    pub overrides: LinkOverride,
}

impl CommandLink {
    /// Create a link with neutral overrides
    pub fn new(parent: impl Into<String>, order_index: i64, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            overrides: LinkOverride {
                order_index,
                ..LinkOverride::default()
            },
        }
    }

    /// Builder-style waitable override
    pub fn waitable(mut self, waitable: bool) -> Self {
        self.overrides.waitable_override = waitable;
        self
    }

    /// Builder-style preset override
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.overrides.preset_input_override = Some(input.into());
        self
    }
}

/// Ordered, cycle-checked queue of terminal steps
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedChain {
    /// Name the chain was resolved from
    pub name: String,
    steps: VecDeque<StepConfig>,
}

impl ResolvedChain {
    /// Build a chain from steps in execution order
    pub fn new(name: impl Into<String>, steps: impl IntoIterator<Item = StepConfig>) -> Self {
        Self {
            name: name.into(),
            steps: steps.into_iter().collect(),
        }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain holds no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in execution order
    pub fn steps(&self) -> impl Iterator<Item = &StepConfig> {
        self.steps.iter()
    }

    /// Step names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Consume into the queue the engine drains
    pub fn into_queue(self) -> VecDeque<StepConfig> {
        self.steps
    }
}
