//! REST API Routes Module
//!
//! - Task CRUD under `/tasks`
//! - Health check endpoints under `/health` (Kubernetes-compatible)

pub mod health;
pub mod task;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::state::AppState;

/// Create the complete API router.
///
/// Every request is traced and bounded by `http.request_timeout_secs`.
pub fn create_api_router(state: AppState, http: &HttpConfig) -> Router {
    Router::new()
        .nest("/tasks", task::create_router(state.clone()))
        .nest("/health", health::create_router(state))
        .layer(TimeoutLayer::new(http.request_timeout()))
        .layer(TraceLayer::new_for_http())
}
