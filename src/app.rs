//! Application wiring: store, publisher, pipeline and router

use axum::Router;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use pulse_core::Config;
use pulse_core::application::AdmissionPipeline;
use pulse_core::config::{ServerConfig, StoreBackend};
use pulse_core::infrastructure::publisher::{EventPublisher, KafkaEventPublisher};
use pulse_core::infrastructure::store::{
    AdmissionStore, DragonflyAdmissionStore, InMemoryAdmissionStore,
};
use pulse_core::infrastructure::tenant_directory::TenantDirectory;
use pulse_gateway::{GatewayState, create_router};

pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

/// Spawns a background task that purges expired entries from the store.
/// Respects the cancellation token for graceful shutdown.
fn spawn_store_cleanup(
    store: Arc<dyn AdmissionStore>,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        // The first tick completes immediately and there is nothing to purge yet
        interval_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::debug!("Store cleanup task stopped");
                    break;
                }
                _ = interval_timer.tick() => {
                    store.cleanup().await;
                }
            }
        }
    });
}

async fn connect_store(
    config: &Config,
    shutdown_token: &CancellationToken,
) -> Result<Arc<dyn AdmissionStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.store.backend {
        StoreBackend::Dragonfly => {
            let store =
                DragonflyAdmissionStore::connect(&config.store.url, config.store.command_timeout())
                    .await
                    .map_err(|e| {
                        format!(
                            "Failed to connect to admission store at {}: {}",
                            config.store.url, e
                        )
                    })?;
            tracing::info!(url = %config.store.url, "Admission store using Dragonfly backend");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!(
                "Admission store using in-memory backend; deduplication and rate limits are per instance"
            );
            let store: Arc<dyn AdmissionStore> = Arc::new(InMemoryAdmissionStore::new());
            spawn_store_cleanup(
                Arc::clone(&store),
                Duration::from_secs(config.store.cleanup_interval_seconds.max(1)),
                shutdown_token.clone(),
            );
            Ok(store)
        }
    }
}

/// Assemble the router from already-connected dependencies.
pub fn build_app(
    config: &Config,
    store: Arc<dyn AdmissionStore>,
    publisher: Arc<dyn EventPublisher>,
    shutdown_token: CancellationToken,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let tenants = Arc::new(TenantDirectory::parse(&config.tenants.api_keys)?);

    let pipeline = Arc::new(AdmissionPipeline::from_config(
        config,
        tenants,
        Arc::clone(&store),
        publisher,
    ));

    tracing::info!(
        idempotency_enabled = config.idempotency.enabled,
        idempotency_ttl_seconds = config.idempotency.ttl_seconds,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_window = config.rate_limit.requests_per_window,
        window_seconds = config.rate_limit.window_seconds,
        "Admission pipeline configured"
    );

    let router = create_router(GatewayState::new(pipeline, store), &config.server);

    Ok(AppHandle {
        router,
        shutdown_token,
    })
}

/// Connect to the store and the event log, then assemble the application.
///
/// Startup fails when either dependency is unreachable.
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let startup_time = Instant::now();
    let shutdown_token = CancellationToken::new();

    let store = connect_store(&config, &shutdown_token).await?;

    let publisher: Arc<dyn EventPublisher> = Arc::new(
        KafkaEventPublisher::connect(&config.event_log)
            .await
            .map_err(|e| format!("Failed to connect to event log: {}", e))?,
    );

    let handle = build_app(&config, store, publisher, shutdown_token)?;

    tracing::info!(
        startup_ms = startup_time.elapsed().as_millis(),
        "Application initialized"
    );

    Ok(handle)
}

/// Bind the listening socket. `host` may be an IP literal or a name that
/// resolves, such as `localhost`.
pub async fn bind_listener(
    config: &ServerConfig,
) -> Result<TcpListener, Box<dyn std::error::Error + Send + Sync>> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| format!("Failed to bind {}:{}: {}", config.host, config.port, e).into())
}
