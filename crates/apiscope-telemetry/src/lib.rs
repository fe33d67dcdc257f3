//! Observability for apiscope.
//!
//! - **Logging**: structured `tracing` output, JSON or pretty, filtered by an `EnvFilter`
//! - **Metrics**: Prometheus-format counters via the `metrics` crate
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `apiscope_validations_total` | Counter | `outcome` | Validation middleware passes |
//! | `apiscope_descriptor_requests_total` | Counter | `kind` | Descriptor responses |
//! | `apiscope_proxy_requests_total` | Counter | `status` | Requests forwarded upstream |
//! | `apiscope_proxy_duration_seconds` | Histogram | - | Upstream latency |
//!
//! # Example
//!
//! ```rust,ignore
//! use apiscope_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_service("content-api").with_metrics_addr("0.0.0.0:9090");
//!
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{
    init_metrics, record_descriptor_served, record_proxy_request, record_validation, render_metrics,
    MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
