//! Inbound updates
//!
//! The upstream feed delivers one `(context, path, value, timestamp)` tuple
//! per field. This module holds that tuple and decodes it from the JSON
//! record form `{"context": .., "path": .., "value": .., "timestamp": ..}`.

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::UpdateError;
use crate::fields::FieldId;

/// One normalised field update from the feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    /// Upstream identifier of the object this update describes
    pub context: String,
    /// Signal K path of the field
    pub path: String,
    /// Raw, untrusted value
    pub value: Value,
    /// Epoch milliseconds
    pub timestamp_ms: u64,
}

impl Update {
    pub fn new(context: &str, path: &str, value: Value, timestamp_ms: u64) -> Self {
        Update {
            context: context.to_string(),
            path: path.to_string(),
            value,
            timestamp_ms,
        }
    }

    /// The recognised field, if any
    pub fn field(&self) -> Option<FieldId> {
        FieldId::from_path(&self.path)
    }

    /// Decode a JSON record.
    ///
    /// `timestamp` may be epoch milliseconds or an RFC 3339 string; when it
    /// is absent or null, `received_ms` is used.
    pub fn from_json(record: Value, received_ms: u64) -> Result<Update, UpdateError> {
        let Value::Object(mut map) = record else {
            return Err(UpdateError::NotAnObject);
        };

        let context = non_blank(map.get("context")).ok_or(UpdateError::MissingContext)?;
        let path = non_blank(map.get("path")).ok_or(UpdateError::MissingPath)?;
        let timestamp_ms = match map.get("timestamp") {
            None | Some(Value::Null) => received_ms,
            Some(ts) => parse_timestamp(ts)?,
        };
        let value = map.remove("value").unwrap_or(Value::Null);

        Ok(Update {
            context,
            path,
            value,
            timestamp_ms,
        })
    }

    /// Decode one line of newline-delimited JSON
    pub fn from_line(line: &str, received_ms: u64) -> Result<Update, UpdateError> {
        let record: Value = serde_json::from_str(line)?;
        Update::from_json(record, received_ms)
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_timestamp(value: &Value) -> Result<u64, UpdateError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| UpdateError::InvalidTimestamp(n.to_string())),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok())
            .ok_or_else(|| UpdateError::InvalidTimestamp(s.clone())),
        other => Err(UpdateError::InvalidTimestamp(other.to_string())),
    }
}
