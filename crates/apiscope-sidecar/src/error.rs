//! Error types for the apiscope sidecar.

use http::StatusCode;
use thiserror::Error;

/// Sidecar-specific errors.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] apiscope_config::ConfigError),

    /// Logging or metrics could not be initialized.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] apiscope_telemetry::TelemetryError),

    /// The descriptor file could not be loaded.
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] apiscope_descriptor::DescriptorError),

    /// The OpenAPI document could not be loaded, validated or compiled.
    #[error("Validation setup error: {0}")]
    Sentinel(#[from] apiscope_sentinel::SentinelError),

    /// Upstream connection error.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Error message.
        message: String,
    },

    /// Server startup error.
    #[error("Server error: {message}")]
    Server {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SidecarError {
    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// HTTP status answered to the client for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for the JSON error envelope.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Descriptor(_) => "DESCRIPTOR_ERROR",
            Self::Sentinel(_) => "VALIDATION_SETUP_ERROR",
            Self::Upstream { .. } => "UPSTREAM_UNAVAILABLE",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type for sidecar operations.
pub type SidecarResult<T> = Result<T, SidecarError>;
