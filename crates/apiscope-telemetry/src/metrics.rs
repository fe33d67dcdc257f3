//! Prometheus metrics for apiscope.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `apiscope_validations_total` | Counter | `outcome` | Requests seen by the validation middleware |
//! | `apiscope_descriptor_requests_total` | Counter | `kind` | Descriptor responses by kind |
//! | `apiscope_proxy_requests_total` | Counter | `status` | Requests forwarded upstream |
//! | `apiscope_proxy_duration_seconds` | Histogram | - | Upstream round-trip latency |
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Descriptor served with the original bytes (no usable `X-Original-Request-URL`).
pub const DESCRIPTOR_ORIGINAL: &str = "original";
/// Descriptor rewritten for the request.
pub const DESCRIPTOR_REWRITTEN: &str = "rewritten";
/// Rewriting failed to serialize; original bytes served.
pub const DESCRIPTOR_FALLBACK: &str = "fallback";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Service name for metric labels.
    pub service_name: String,

    /// Histogram buckets for upstream latency.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            service_name: "apiscope".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Initializes the metrics subsystem.
///
/// Installs the Prometheus recorder with an HTTP listener on `config.addr`.
/// Does nothing when metrics are disabled.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full("apiscope_proxy_duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "apiscope_validations_total",
        "Requests inspected by the validation middleware, by outcome"
    );
    describe_counter!(
        "apiscope_descriptor_requests_total",
        "Descriptor endpoint responses, by kind"
    );
    describe_counter!(
        "apiscope_proxy_requests_total",
        "Requests forwarded to the upstream application, by status"
    );
    describe_histogram!(
        "apiscope_proxy_duration_seconds",
        "Upstream round-trip latency in seconds"
    );
}

/// Records one pass of the validation middleware.
///
/// `outcome` is one of `passed`, `route_not_found` or `schema_violation`.
pub fn record_validation(outcome: &'static str) {
    counter!("apiscope_validations_total", "outcome" => outcome).increment(1);
}

/// Records one descriptor response.
///
/// `kind` is one of [`DESCRIPTOR_ORIGINAL`], [`DESCRIPTOR_REWRITTEN`] or
/// [`DESCRIPTOR_FALLBACK`].
pub fn record_descriptor_served(kind: &'static str) {
    counter!("apiscope_descriptor_requests_total", "kind" => kind).increment(1);
}

/// Records a request forwarded upstream.
///
/// `status` is the upstream status code, or `0` when the upstream could not be reached.
pub fn record_proxy_request(status: u16, duration: Duration) {
    counter!("apiscope_proxy_requests_total", "status" => status.to_string()).increment(1);
    histogram!("apiscope_proxy_duration_seconds").record(duration.as_secs_f64());
}
