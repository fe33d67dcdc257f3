//! Combined logging and metrics settings.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Settings for [`init_telemetry`](crate::init_telemetry).
///
/// The service name is stamped on every log line and as the `service` label
/// of every metric, so it is kept in sync through [`for_service`](Self::for_service)
/// and the `with_*` setters.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name reported in logs and metrics.
    pub service_name: String,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,

    /// Subscriber settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Default settings reported under `service_name`.
    pub fn for_service(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        Self {
            metrics: MetricsConfig {
                service_name: service_name.clone(),
                ..MetricsConfig::default()
            },
            logging: LogConfig {
                service_name: service_name.clone(),
                ..LogConfig::default()
            },
            service_name,
        }
    }

    /// Neither a subscriber nor an exporter; recording calls become no-ops.
    pub fn quiet() -> Self {
        let mut config = Self::default();
        config.logging.enabled = false;
        config.metrics.enabled = false;
        config
    }

    /// Replaces the logging settings, keeping the service name.
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = LogConfig {
            service_name: self.service_name.clone(),
            ..logging
        };
        self
    }

    /// Replaces the metrics settings, keeping the service name.
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = MetricsConfig {
            service_name: self.service_name.clone(),
            ..metrics
        };
        self
    }

    /// Enables the exporter on `addr`.
    pub fn with_metrics_addr(mut self, addr: impl Into<String>) -> Self {
        self.metrics.enabled = true;
        self.metrics.addr = addr.into();
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::for_service("apiscope")
    }
}
