//! Route definitions

use axum::http::StatusCode;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Json,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;

use pulse_core::config::ServerConfig;

use crate::presentation::{
    controllers::{GatewayState, events::submit_event, health::health_check},
    middleware::{error_envelope_middleware, logging_middleware},
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::events::submit_event,
        crate::presentation::controllers::health::health_check
    ),
    components(
        schemas(
            EventSubmission,
            IngestResponse,
            ErrorResponse,
            ErrorDetail,
            HealthResponse
        )
    ),
    tags(
        (name = "events", description = "Event submission"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Pulse Ingest Gateway API",
        description = "Multi-tenant event ingestion with idempotent submission and per-tenant rate limits"
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the gateway router
pub fn create_router(state: GatewayState, config: &ServerConfig) -> Router {
    let service_builder = ServiceBuilder::new()
        // HTTP tracing
        .layer(TraceLayer::new_for_http())
        // Envelope for timeout, body limit and routing errors
        .layer(middleware::map_response(error_envelope_middleware))
        // Request timeout
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds),
        ))
        .layer(middleware::from_fn(logging_middleware));

    Router::new()
        .route("/events", post(submit_event))
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(service_builder)
        .with_state(state)
}
