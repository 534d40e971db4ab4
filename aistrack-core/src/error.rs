//! Error types for inbound update decoding

use thiserror::Error;

/// Errors that can occur when decoding an inbound update record.
///
/// Only the envelope can be malformed; field values never fail and are
/// coerced to `None` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// Record is not a JSON object
    #[error("Update record is not an object")]
    NotAnObject,

    /// Context is missing, not a string, or blank
    #[error("Update record has no context")]
    MissingContext,

    /// Path is missing, not a string, or blank
    #[error("Update record has no path")]
    MissingPath,

    /// Timestamp is present but cannot be interpreted
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Record is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for UpdateError {
    fn from(e: serde_json::Error) -> Self {
        UpdateError::InvalidJson(e.to_string())
    }
}
