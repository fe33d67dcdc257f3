//! Main configuration type.
//!
//! This module provides the top-level [`ApiscopeConfig`] struct.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{
    ApplicationConfig, ConfigError, DescriptorConfig, ServerConfig, TelemetryConfigSection,
    ValidationConfig,
};

/// Complete apiscope sidecar configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use apiscope_config::ApiscopeConfig;
///
/// let config = ApiscopeConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.descriptor.serve_path, "/__api");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ApiscopeConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// The fronted application.
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Descriptor location and serving path.
    #[serde(default)]
    pub descriptor: DescriptorConfig,

    /// Request validation.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl ApiscopeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - Server or metrics address is not a socket address
    /// - Application name is empty or its port is 0
    /// - The upstream URL does not parse
    /// - The serving path is not an absolute, non-root path
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.application.name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "application.name",
                "must not be empty",
            ));
        }

        if self.application.port == 0 {
            return Err(ConfigError::invalid(
                "application.port",
                "must be between 1 and 65535",
            ));
        }

        let upstream = self.application.upstream();
        if let Err(e) = url::Url::parse(&upstream) {
            return Err(ConfigError::invalid(
                "application.upstream_url",
                format!("invalid URL {upstream}: {e}"),
            ));
        }

        let serve_path = &self.descriptor.serve_path;
        if !serve_path.starts_with('/') || serve_path.len() < 2 {
            return Err(ConfigError::invalid(
                "descriptor.serve_path",
                format!("must start with '/' and name a path: {serve_path}"),
            ));
        }

        if self.telemetry.metrics.enabled
            && self.telemetry.metrics.addr.parse::<SocketAddr>().is_err()
        {
            return Err(ConfigError::invalid(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        if let Err(e) =
            apiscope_telemetry::logging::create_env_filter(&self.telemetry.logging.level)
        {
            return Err(ConfigError::invalid(
                "telemetry.logging.level",
                e.to_string(),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty log output at debug level with source locations.
    ///
    /// # Example
    ///
    /// ```
    /// use apiscope_config::ApiscopeConfig;
    ///
    /// let config = ApiscopeConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = crate::LogFormat::Pretty;
        config.telemetry.logging.include_location = true;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiscopeConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.application.upstream(), "http://localhost:8081");
        assert_eq!(config.telemetry.service_name, "apiscope");
        assert!(config.validation.enabled);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(ApiscopeConfig::default().validate().is_ok());
        assert!(ApiscopeConfig::development().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let mut config = ApiscopeConfig::default();
        config.server.http_addr = "not-an-address".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http_addr"));
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = ApiscopeConfig::default();
        config.application.port = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("application.port"));
    }

    #[test]
    fn test_validate_empty_app_name() {
        let mut config = ApiscopeConfig::default();
        config.application.name = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("application.name"));
    }

    #[test]
    fn test_validate_invalid_upstream() {
        let mut config = ApiscopeConfig::default();
        config.application.upstream_url = Some("not a url".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("upstream_url"));
    }

    #[test]
    fn test_validate_serve_path() {
        for bad in ["__api", "/", ""] {
            let mut config = ApiscopeConfig::default();
            config.descriptor.serve_path = bad.to_string();

            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("serve_path"), "{bad}");
        }
    }

    #[test]
    fn test_validate_metrics_addr_only_when_enabled() {
        let mut config = ApiscopeConfig::default();
        config.telemetry.metrics.addr = "invalid".to_string();
        assert!(config.validate().is_ok());

        config.telemetry.metrics.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.addr"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = ApiscopeConfig::default();
        config.telemetry.logging.level = "apiscope=notalevel".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_toml_serialization() {
        let config = ApiscopeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[descriptor]"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
            [application]
            name = "people-api"
            port = 8080

            [descriptor]
            path = "/etc/people/openapi.yml"
        "#;

        let config: ApiscopeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.application.name, "people-api");
        assert_eq!(config.descriptor.path, "/etc/people/openapi.yml");
        assert_eq!(config.descriptor.serve_path, "/__api");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [descriptor]
            path = "openapi.yml"
            unknown_field = "value"
        "#;

        let result: Result<ApiscopeConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
