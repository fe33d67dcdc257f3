//! Typed configuration for the apiscope sidecar.
//!
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`ApiscopeConfig`] holds every section:
//!
//! - [`ServerConfig`] - listen address and timeouts
//! - [`ApplicationConfig`] - the fronted application and upstream URL
//! - [`DescriptorConfig`] - descriptor file and serving path
//! - [`ValidationConfig`] - request validation switches
//! - [`TelemetryConfigSection`] - metrics and logging
//!
//! # Example
//!
//! ```no_run
//! use apiscope_config::ConfigLoader;
//!
//! # fn main() -> Result<(), apiscope_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("apiscope.toml")?
//!     .with_dotenv()
//!     .with_env_prefix("APISCOPE")
//!     .load()?;
//!
//! println!("serving descriptor at {}", config.descriptor.serve_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [application]
//! name = "people-api"
//! port = 8080
//!
//! [descriptor]
//! path = "api/openapi.yml"
//! serve_path = "/__api"
//!
//! [validation]
//! enabled = true
//! multi_error = true
//!
//! [telemetry]
//! service_name = "people-api-sidecar"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY`, for example:
//!
//! - `APISCOPE__APPLICATION__NAME=people-api`
//! - `APISCOPE__DESCRIPTOR__PATH=/etc/people/openapi.yml`
//! - `APISCOPE__TELEMETRY__METRICS__ENABLED=true`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::ApiscopeConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
