//! Tracing Subscriber Initialization

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_lookup;
use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "taskvault_api=debug,taskvault_storage=debug,tower_http=debug,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}', expected json or pretty")),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `TASKVAULT_LOG_FORMAT`: json or pretty
    pub log_format: LogFormat,
    /// Service name attached to the startup event
    pub service_name: String,
    /// `TASKVAULT_ENVIRONMENT`
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_lookup(env_lookup)
    }
}

impl TelemetryConfig {
    /// Unknown formats fall back to JSON.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            log_format: lookup("TASKVAULT_LOG_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            environment: lookup("TASKVAULT_ENVIRONMENT").unwrap_or_else(|| "local".to_string()),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup, before anything logs. The filter comes from
/// `RUST_LOG` when set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        environment = config.environment,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}
