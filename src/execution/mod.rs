//! Chain execution
//!
//! [`ExecutionEngine`] walks a resolved chain, pausing for input and
//! following pipe redirects; [`StepRunner`] is the seam to the external
//! processes it launches, with [`ProcessRunner`] as the real implementation.

pub mod engine;
pub mod report;
pub mod runner;

pub use engine::{CancelHandle, EngineState, ExecutionEngine};
pub use report::{PipeTarget, ReportError, RunReport, SuggestionReport};
pub use runner::{InvocationMode, ProcessRunner, RunOutcome, StepRunner};
