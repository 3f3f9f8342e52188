//! Health Check Endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health/ping - Simple liveness check
//! - /health/ready - Store and cache connectivity check
//! - /health/live - Process alive check
//!
//! Readiness follows the durable store only. A failing cache is reported as
//! degraded because every operation still succeeds through the store.

use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use taskvault_storage::TaskService;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    /// Backend in use, e.g. `postgres`, `redis`, `memory`.
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    /// Overall status from the store and cache probes.
    pub fn overall(store: HealthStatus, cache: HealthStatus) -> HealthStatus {
        match (store, cache) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Healthy, _) => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check
pub async fn readiness(
    State(service): State<TaskService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let store = probe(service.store().backend_name(), HealthStatus::Unhealthy, async {
        service.store().ping().await.map_err(|e| e.to_string())
    })
    .await;
    let op_timeout = service.settings().op_timeout;
    let cache = probe(service.cache().provider_name(), HealthStatus::Degraded, async {
        match tokio::time::timeout(op_timeout, service.cache().ping()).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("ping exceeded {:?}", op_timeout)),
        }
    })
    .await;

    let overall_status = HealthStatus::overall(store.status, cache.status);
    if overall_status != HealthStatus::Healthy {
        tracing::warn!(
            store = ?store.status,
            cache = ?cache.status,
            "readiness check not healthy"
        );
    }

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            store,
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

async fn probe(
    backend: &str,
    on_failure: HealthStatus,
    check: impl Future<Output = Result<(), String>>,
) -> ComponentHealth {
    let start = Instant::now();
    match check.await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            backend: backend.to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => ComponentHealth {
            status: on_failure,
            backend: backend.to_string(),
            latency_ms: None,
            error: Some(e),
        },
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}
