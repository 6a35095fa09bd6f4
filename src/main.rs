//! Pulse Ingest - Main application entry point

use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use pulse_ingest::{Config, bind_listener, create_app, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_server().await
}

/// Run the HTTP server
async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Config::load validates every section before returning
    let config = Config::load().map_err(|e| {
        std::io::Error::other(format!(
            "Failed to load configuration. Check config/*.toml and PULSE__* env vars: {}",
            e
        ))
    })?;

    // Initialize tracing (after config is loaded so we can use logging config)
    init_tracing(&config.logging)?;

    tracing::info!("Starting Pulse ingest gateway...");
    tracing::info!(
        "Configuration loaded: server={}:{}, topic={}",
        config.server.host,
        config.server.port,
        config.event_log.topic
    );

    let server_config = config.server.clone();
    let grace_period = Duration::from_secs(config.server.shutdown_grace_seconds);

    let app_handle = create_app(config).await.map_err(|e| {
        Box::new(std::io::Error::other(format!(
            "Failed to create application: {}",
            e
        )))
    })?;

    let listener = bind_listener(&server_config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("OpenAPI document available at http://{}/api-docs/openapi.json", addr);

    let shutdown_token = app_handle.shutdown_token.clone();
    let server = axum::serve(listener, app_handle.router)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = grace_period_elapsed(shutdown_token, grace_period) => {
            tracing::warn!(
                grace_seconds = grace_period.as_secs(),
                "Shutdown grace period elapsed, closing remaining connections"
            );
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves once shutdown has started and `grace` has passed since.
async fn grace_period_elapsed(shutdown_token: CancellationToken, grace: Duration) {
    shutdown_token.cancelled().await;
    tokio::time::sleep(grace).await;
}

/// Wait for Ctrl+C or SIGTERM, then cancel background tasks
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }

    // New connections stop here; in-flight requests get the grace period
    shutdown_token.cancel();
}
