//! HTTP middleware and response shaping

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::time::Instant;

use pulse_core::application::IngestError;

use crate::presentation::models::ErrorResponse;

/// Convert IngestError to HTTP response
pub fn ingest_error_to_response(error: IngestError) -> Response {
    let status = match &error {
        IngestError::Validation { .. } => StatusCode::BAD_REQUEST,
        IngestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        IngestError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        IngestError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let code = error.code();

    // 4xx = client errors (warn level), 5xx = server errors (error level)
    if status.is_server_error() {
        tracing::error!(
            error = %error,
            http_status = %status,
            error_code = code,
            "Server error mapped to HTTP response"
        );
    } else {
        tracing::warn!(
            error = %error,
            http_status = %status,
            error_code = code,
            "Client error mapped to HTTP response"
        );
    }

    let mut response = (status, Json(ErrorResponse::new(code, error.to_string()))).into_response();

    if let IngestError::RateLimited {
        limit,
        retry_after,
        reset_at,
        ..
    } = error
    {
        add_rate_limit_headers(&mut response, limit, 0, reset_at);
        if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert("retry-after", val);
        }
    }

    response
}

/// IETF draft rate limit headers
/// https://datatracker.ietf.org/doc/html/draft-ietf-httpapi-ratelimit-headers
pub fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset_at: u64) {
    let headers = response.headers_mut();

    headers.insert("ratelimit-limit", HeaderValue::from(limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));

    if let Ok(val) = HeaderValue::from_str(&reset_at.to_string()) {
        headers.insert("ratelimit-reset", val);
    }
}

/// Rewrap error responses produced outside the handlers (request timeout,
/// body limit, unknown route) into the shared `{error:{code,message}}` body.
/// JSON responses already carry the envelope and pass through.
pub async fn error_envelope_middleware(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    let (code, message) = match status {
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT".to_string(), "Request timed out"),
        StatusCode::PAYLOAD_TOO_LARGE => (
            "PAYLOAD_TOO_LARGE".to_string(),
            "Request body exceeds the size limit",
        ),
        other => {
            let reason = other.canonical_reason().unwrap_or("Error");
            (reason.to_uppercase().replace([' ', '-'], "_"), reason)
        }
    };

    tracing::warn!(http_status = %status, error_code = %code, "Framework error mapped to HTTP response");

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);

    let mut enveloped = (status, Json(ErrorResponse::new(code, message))).into_response();
    for (name, value) in parts.headers.iter() {
        if !enveloped.headers().contains_key(name) {
            enveloped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    enveloped
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    tracing::debug!(method = %method, uri = %uri, "Processing request");

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
