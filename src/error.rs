//! Error types and Result aliases for launchline

use std::fmt;
use std::path::PathBuf;

/// Result type alias for launchline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for launchline
#[derive(Debug)]
pub enum Error {
    // === Resolution errors ===
    /// Command name absent, or hidden by the current visibility mode
    NotFound {
        name: String,
    },

    /// Composite links lead back into a command already on the path
    CycleDetected {
        name: String,
    },

    /// Catalog unreachable or a query failed
    Storage {
        reason: String,
    },

    // === Process errors ===
    /// Executable missing or step configuration not runnable
    ProcessLaunchFailure {
        command: String,
        reason: String,
    },

    /// Process ran but reported failure (stderr output, exit code, contradictory result)
    ProcessRuntimeFailure {
        command: String,
        reason: String,
    },

    /// Step output could not be decoded into the expected report
    DecodeFailure {
        command: String,
        reason: String,
    },

    // === Engine errors ===
    /// A pipe request named a command that did not resolve to exactly one step
    PipeTargetInvalid {
        name: String,
        steps: usize,
    },

    /// Input supplied while no step is paused
    EngineNotAwaitingInput,

    /// Background execution task ended without reporting
    BackgroundTaskLost,

    // === Registration errors ===
    /// Plugin manifest missing or malformed
    ManifestInvalid {
        path: PathBuf,
        reason: String,
    },

    // === Configuration errors ===
    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl Error {
    /// Whether this error came from resolving a name rather than running it
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::CycleDetected { .. } | Error::Storage { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Resolution errors
            Error::NotFound { name } => {
                write!(f, "Command '{}' not found", name)
            }
            Error::CycleDetected { name } => {
                write!(f, "Command '{}' contains a circular reference", name)
            }
            Error::Storage { reason } => {
                write!(f, "Catalog query failed: {}", reason)
            }

            // Process errors
            Error::ProcessLaunchFailure { command, reason } => {
                write!(f, "Failed to launch '{}': {}", command, reason)
            }
            Error::ProcessRuntimeFailure { command, reason } => {
                write!(f, "Step '{}' failed: {}", command, reason)
            }
            Error::DecodeFailure { command, reason } => {
                write!(f, "Could not decode output of '{}': {}", command, reason)
            }

            // Engine errors
            Error::PipeTargetInvalid { name, steps } => {
                write!(
                    f,
                    "Pipe target '{}' resolved to {} steps (expected exactly one)",
                    name, steps
                )
            }
            Error::EngineNotAwaitingInput => {
                write!(f, "No step is waiting for input")
            }
            Error::BackgroundTaskLost => {
                write!(f, "Background execution ended without a result")
            }

            // Registration errors
            Error::ManifestInvalid { path, reason } => {
                write!(f, "Invalid plugin manifest '{}': {}", path.display(), reason)
            }

            // Configuration errors
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage {
            reason: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
