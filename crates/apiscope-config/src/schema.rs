//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// Controls where the sidecar listens and how long it waits.
///
/// # Example
///
/// ```
/// use apiscope_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "0.0.0.0:8080".to_string(),
///     shutdown_timeout_secs: 30,
///     request_timeout_ms: 30000,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

/// The application the sidecar fronts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    /// Host name the application is reachable under inside the cluster.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Port the application listens on.
    #[serde(default = "default_app_port")]
    pub port: u16,

    /// Where to proxy requests. Defaults to `http://{name}:{port}`.
    #[serde(default)]
    pub upstream_url: Option<String>,
}

impl ApplicationConfig {
    /// The upstream base URL requests are proxied to.
    #[must_use]
    pub fn upstream(&self) -> String {
        self.upstream_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.name, self.port))
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            port: default_app_port(),
            upstream_url: None,
        }
    }
}

fn default_app_name() -> String {
    "localhost".to_string()
}

fn default_app_port() -> u16 {
    8081
}

/// The OpenAPI descriptor and where it is served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DescriptorConfig {
    /// Path of the YAML or JSON descriptor on disk.
    #[serde(default = "default_descriptor_path")]
    pub path: String,

    /// Request path the descriptor is served at.
    #[serde(default = "default_serve_path")]
    pub serve_path: String,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            path: default_descriptor_path(),
            serve_path: default_serve_path(),
        }
    }
}

fn default_descriptor_path() -> String {
    "api/openapi.yml".to_string()
}

fn default_serve_path() -> String {
    "/__api".to_string()
}

/// Request validation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Validate proxied requests against the descriptor.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Report every violation instead of stopping at the first.
    #[serde(default = "default_true")]
    pub multi_error: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multi_error: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus metrics endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,

    /// Histogram bucket boundaries for upstream latency.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or `target=level`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name for telemetry identification.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl From<&TelemetryConfigSection> for apiscope_telemetry::TelemetryConfig {
    fn from(section: &TelemetryConfigSection) -> Self {
        let logging = apiscope_telemetry::LogConfig {
            enabled: section.logging.enabled,
            level: section.logging.level.clone(),
            format: match section.logging.format {
                LogFormat::Json => apiscope_telemetry::LogFormat::Json,
                LogFormat::Pretty => apiscope_telemetry::LogFormat::Pretty,
            },
            file_line_info: section.logging.include_location,
            ..apiscope_telemetry::LogConfig::default()
        };
        let metrics = apiscope_telemetry::MetricsConfig {
            enabled: section.metrics.enabled,
            addr: section.metrics.addr.clone(),
            duration_buckets: section.metrics.histogram_buckets.clone(),
            ..apiscope_telemetry::MetricsConfig::default()
        };

        Self::for_service(section.service_name.clone())
            .with_logging(logging)
            .with_metrics(metrics)
    }
}

fn default_service_name() -> String {
    "apiscope".to_string()
}

fn default_true() -> bool {
    true
}
