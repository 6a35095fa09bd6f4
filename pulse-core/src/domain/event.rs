//! Inbound event envelope and its structural validation

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structural problems with a submitted event. The messages are shown to the
/// client verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    #[error("Invalid JSON payload")]
    MalformedJson,

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("schema_version must be positive")]
    NonPositiveSchemaVersion,

    #[error("occurred_at must be in RFC3339 format")]
    InvalidTimestamp,

    #[error("payload must be a JSON object")]
    PayloadNotObject,

    #[error("Idempotency-Key header is required")]
    MissingIdempotencyKey,
}

/// Wire shape of the request body before validation. Every field is optional
/// so that a missing field is reported by name instead of as a decode error.
#[derive(Deserialize)]
struct RawEvent {
    event_id: Option<String>,
    event_type: Option<String>,
    schema_version: Option<i64>,
    occurred_at: Option<String>,
    payload: Option<serde_json::Value>,
}

/// A structurally valid event submission. Payload contents are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_id: String,
    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: String,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl InboundEvent {
    /// Decode and validate a request body.
    pub fn parse(body: &[u8]) -> Result<Self, EventValidationError> {
        let raw: RawEvent =
            serde_json::from_slice(body).map_err(|_| EventValidationError::MalformedJson)?;

        let event_id = non_empty(raw.event_id, "event_id")?;
        let event_type = non_empty(raw.event_type, "event_type")?;

        let schema_version = match raw.schema_version {
            Some(v) if v > 0 => {
                u32::try_from(v).map_err(|_| EventValidationError::MalformedJson)?
            }
            _ => return Err(EventValidationError::NonPositiveSchemaVersion),
        };

        let occurred_at = non_empty(raw.occurred_at, "occurred_at")?;
        DateTime::parse_from_rfc3339(&occurred_at)
            .map_err(|_| EventValidationError::InvalidTimestamp)?;

        let payload = match raw.payload {
            None | Some(serde_json::Value::Null) => {
                return Err(EventValidationError::MissingField { field: "payload" });
            }
            Some(serde_json::Value::Object(map)) => map,
            Some(_) => return Err(EventValidationError::PayloadNotObject),
        };

        Ok(Self {
            event_id,
            event_type,
            schema_version,
            occurred_at,
            payload,
        })
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, EventValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EventValidationError::MissingField { field }),
    }
}

/// Client-supplied token naming one logical submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Rejects a missing or empty header value.
    pub fn from_header(value: Option<&str>) -> Result<Self, EventValidationError> {
        match value {
            Some(v) if !v.is_empty() => Ok(Self(v.to_string())),
            _ => Err(EventValidationError::MissingIdempotencyKey),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
