use axum::{extract::State, response::Json};
use std::collections::BTreeMap;

use crate::presentation::controllers::GatewayState;
use crate::presentation::models::HealthResponse;

/// GET /health - Dependency status
///
/// Always 200: the admission pipeline keeps accepting while the store is
/// down, so an unhealthy store degrades the service rather than stopping it.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let mut dependencies = BTreeMap::new();

    let redis = match state.store.ping().await {
        Ok(()) => "healthy".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Admission store health check failed");
            format!("unhealthy: {}", e)
        }
    };
    dependencies.insert("redis".to_string(), redis);

    // The publisher connected at startup or the process would not be serving
    dependencies.insert("kafka".to_string(), "healthy".to_string());

    let status = if dependencies.values().all(|v| v == "healthy") {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        dependencies,
    })
}
