use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use std::sync::Arc;

use pulse_core::application::{AdmissionRequest, IngestError};

use crate::presentation::controllers::GatewayState;
use crate::presentation::middleware::{add_rate_limit_headers, ingest_error_to_response};
use crate::presentation::models::{ErrorResponse, EventSubmission, IngestResponse};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// POST /events - Submit one event for admission
#[utoipa::path(
    post,
    path = "/events",
    request_body = EventSubmission,
    params(
        ("X-API-Key" = String, Header, description = "Tenant credential"),
        ("Idempotency-Key" = String, Header, description = "Client token naming this submission attempt")
    ),
    responses(
        (status = 202, description = "Event accepted or recognised as a duplicate", body = IngestResponse),
        (status = 400, description = "Malformed event or missing Idempotency-Key", body = ErrorResponse),
        (status = 401, description = "Missing or unknown API key", body = ErrorResponse),
        (status = 429, description = "Tenant rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Event could not be published", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn submit_event(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = AdmissionRequest {
        credential: header_value(&headers, API_KEY_HEADER),
        idempotency_key: header_value(&headers, IDEMPOTENCY_KEY_HEADER),
        body,
    };

    // Runs detached so a request timeout or client disconnect cannot stop
    // admission between the claim and the publish (or the claim release)
    let pipeline = Arc::clone(&state.pipeline);
    let admission = tokio::spawn(async move { pipeline.admit(request).await });

    let result = match admission.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Admission task failed");
            Err(IngestError::internal("Internal server error"))
        }
    };

    match result {
        Ok(outcome) => {
            let mut response = (
                StatusCode::ACCEPTED,
                Json(IngestResponse::accepted(outcome.request_id, outcome.duplicate)),
            )
                .into_response();

            if let Some(rate) = &outcome.rate {
                add_rate_limit_headers(&mut response, rate.limit, rate.remaining, rate.reset_at);
            }

            response
        }
        Err(error) => ingest_error_to_response(error),
    }
}
