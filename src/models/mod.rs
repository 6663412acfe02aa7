//! Core data models for launchline
//!
//! Catalog entries, step configurations, resolved chains and the control
//! signals exchanged between the engine, the dispatcher and the UI.

pub mod command;
pub mod signal;
pub mod step;

// Re-exports for convenience
pub use command::{CommandEntry, CommandMode, Visibility};
pub use signal::{ControlSignal, Directive, Outcome, UiAction};
pub use step::{CommandLink, LinkOverride, ResolvedChain, StepConfig};
