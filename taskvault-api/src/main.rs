//! Taskvault API Server Entry Point
//!
//! Loads configuration, wires the store and cache, and starts the Axum HTTP
//! server.

use taskvault_api::telemetry::{init_tracing, TelemetryConfig};
use taskvault_api::{build_app, ApiError, ApiResult, AppConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = AppConfig::load()?;
    let addr = config.http.socket_addr()?;

    let app = build_app(&config).await?;

    tracing::info!(%addr, environment = %config.environment, "Starting taskvault API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
