//! Telemetry setup failures.

use thiserror::Error;

/// Why logging or metrics could not be started.
///
/// Recording never fails; only [`init_telemetry`](crate::init_telemetry) and
/// its parts return this.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter did not parse or a global subscriber is already set.
    #[error("cannot start logging: {0}")]
    LoggingInit(String),

    /// The Prometheus recorder or its listener could not be installed.
    #[error("cannot start metrics exporter: {0}")]
    MetricsInit(String),

    /// The exporter listen address is not a socket address.
    #[error("invalid metrics listen address {0}")]
    InvalidAddress(String),
}
