//! API request and response models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Event submission body
///
/// Only the shape is checked; `payload` contents are passed through untouched.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct EventSubmission {
    /// Producer-assigned event identifier
    #[schema(example = "evt_01HV7Z8J3K")]
    pub event_id: String,

    /// Event type name
    #[schema(example = "page_view")]
    pub event_type: String,

    /// Positive schema version of `payload`
    #[schema(example = 1, minimum = 1)]
    pub schema_version: u32,

    /// When the event happened, RFC 3339 with offset
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub occurred_at: String,

    /// Arbitrary JSON object
    #[schema(value_type = Object, example = json!({"path": "/pricing"}))]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Response for an accepted submission
#[derive(Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Always `accepted`
    #[schema(example = "accepted")]
    pub status: String,

    /// Identifier of this HTTP request
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub request_id: Uuid,

    /// The idempotency key was already used; nothing new was published
    #[schema(example = false)]
    pub duplicate: bool,
}

impl IngestResponse {
    pub fn accepted(request_id: Uuid, duplicate: bool) -> Self {
        Self {
            status: "accepted".to_string(),
            request_id,
            duplicate,
        }
    }
}

/// Error envelope shared by every failure response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "event_id is required")]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when every dependency is healthy, `degraded` otherwise
    #[schema(example = "ok")]
    pub status: String,

    /// Per-dependency status: `healthy` or `unhealthy: <reason>`
    #[schema(example = json!({"redis": "healthy", "kafka": "healthy"}))]
    pub dependencies: BTreeMap<String, String>,
}
