//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration layer could not be applied or the result is unusable.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file layer was requested but nothing exists at its path.
    #[error("no configuration file at {path}")]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration file {path}")]
    Unreadable {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax error or a field the schema does not know.
    #[error("bad TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax error or a field the schema does not know.
    #[error("bad JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `.toml` nor `.json`.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The merged configuration failed [`validate`](crate::ApiscopeConfig::validate).
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field, e.g. `application.port`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be parsed into its field.
    #[error("override {var}: {reason}")]
    Override {
        /// Variable name, prefix included.
        var: String,
        /// What was expected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// A value rejected by validation.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Override {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
