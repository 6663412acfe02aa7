//! Structured step reports
//!
//! Associatable steps answer on stdout with a small JSON object. Older
//! plugins print Python-style dicts with single quotes and mixed-case keys,
//! so output is normalized before decoding:
//!
//! 1. trim surrounding whitespace
//! 2. replace `'` with `"`
//! 3. drop every `\r` and `\n`
//! 4. lowercase object keys
//!
//! Which shape to decode is chosen by the caller: [`SuggestionReport`] for
//! `-I` queries, [`RunReport`] for `-S` runs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Why a report could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("step printed nothing")]
    Empty,

    #[error("step reported null")]
    Null,

    #[error("malformed report: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ReportError {
    /// Attach the step name
    pub fn into_error(self, command: &str) -> Error {
        Error::DecodeFailure {
            command: command.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Answer to an incremental `-I` query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionReport {
    #[serde(default)]
    pub result: Vec<String>,
}

/// Redirect request carried by a run report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeTarget {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: String,
}

/// Answer to a `-S` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Pause on the same step again
    #[serde(default, rename = "continue")]
    pub keep_waiting: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub pipe: bool,
    #[serde(default)]
    pub info: Option<PipeTarget>,
}

impl SuggestionReport {
    pub fn decode(raw: &str) -> Result<Self, ReportError> {
        decode(raw)
    }
}

impl RunReport {
    pub fn decode(raw: &str) -> Result<Self, ReportError> {
        decode(raw)
    }
}

/// Normalize raw stdout the way legacy plugins expect
pub fn clean_output(raw: &str) -> String {
    raw.trim()
        .replace('\'', "\"")
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect()
}

/// Decode cleaned stdout into `T`, matching keys case-insensitively
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ReportError> {
    let cleaned = clean_output(raw);
    if cleaned.is_empty() {
        return Err(ReportError::Empty);
    }

    let value: Value = serde_json::from_str(&cleaned)?;
    if value.is_null() {
        return Err(ReportError::Null);
    }

    Ok(serde_json::from_value(lowercase_keys(value))?)
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
