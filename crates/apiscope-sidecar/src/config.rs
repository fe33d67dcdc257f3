//! Sidecar configuration loading.
//!
//! Layers are applied in order: defaults, the configuration file (when
//! given), `.env`, then `APISCOPE__SECTION__KEY` environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use apiscope_config::{ApiscopeConfig, ConfigLoader};
use apiscope_sentinel::{ValidationOptions, ValidatorConfig};

use crate::error::SidecarResult;

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "APISCOPE";

/// Loads and validates the sidecar configuration.
pub fn load(path: Option<&Path>) -> SidecarResult<ApiscopeConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_file(path)?,
        None => ConfigLoader::new(),
    };

    Ok(loader.with_dotenv().with_env_prefix(ENV_PREFIX).load()?)
}

/// Validation middleware settings derived from the configuration.
///
/// The `http://{application.name}:{port}` server uses the port the sidecar
/// listens on, since that is the port clients address. An unparsable or
/// ephemeral listen port falls back to `application.port`.
pub fn validator_config(config: &ApiscopeConfig) -> ValidatorConfig {
    let options = ValidationOptions::default().with_multi_error(config.validation.multi_error);
    ValidatorConfig::new(
        &config.descriptor.path,
        &config.application.name,
        listen_port(config),
    )
    .with_options(options)
}

fn listen_port(config: &ApiscopeConfig) -> u16 {
    config
        .server
        .http_addr
        .parse::<SocketAddr>()
        .ok()
        .map(|addr| addr.port())
        .filter(|port| *port != 0)
        .unwrap_or(config.application.port)
}

/// Upstream round-trip timeout.
pub const fn request_timeout(config: &ApiscopeConfig) -> Duration {
    Duration::from_millis(config.server.request_timeout_ms)
}

/// Grace period for in-flight connections at shutdown.
pub const fn shutdown_timeout(config: &ApiscopeConfig) -> Duration {
    Duration::from_secs(config.server.shutdown_timeout_secs)
}
