//! Telemetry - Logging Infrastructure
//!
//! Structured logging through `tracing`, with JSON output for deployed
//! environments and human-readable output for local runs.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
