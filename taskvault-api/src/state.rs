//! Shared application state for Axum routers.

use taskvault_storage::TaskService;

use crate::config::TenancyConfig;

/// Application-wide state shared across all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Cache-coordinated task operations.
    pub service: TaskService,
    pub tenancy: TenancyConfig,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(service: TaskService, tenancy: TenancyConfig) -> Self {
        Self {
            service,
            tenancy,
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(TaskService, service);
crate::impl_from_ref!(TenancyConfig, tenancy);
crate::impl_from_ref!(std::time::Instant, start_time);
