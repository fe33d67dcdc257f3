//! Configuration for the Sentinel.

use std::path::PathBuf;

use crate::validation::ValidationOptions;

/// Host the validator always accepts, for local runs.
pub const LOCAL_SERVER: &str = "http://localhost:8080";

/// Everything needed to build a [`Sentinel`](crate::Sentinel).
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Path of the OpenAPI document.
    pub filename: PathBuf,
    /// Name the application is reachable under.
    pub app_name: String,
    /// Port the application listens on.
    pub app_port: u16,
    /// Request validation options.
    pub options: ValidationOptions,
}

impl ValidatorConfig {
    /// Creates a configuration with default validation options.
    pub fn new(filename: impl Into<PathBuf>, app_name: impl Into<String>, app_port: u16) -> Self {
        Self {
            filename: filename.into(),
            app_name: app_name.into(),
            app_port,
            options: ValidationOptions::default(),
        }
    }

    /// Sets the validation options.
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// The servers registered in addition to the document's own.
    pub fn synthetic_servers(&self) -> [String; 2] {
        [
            LOCAL_SERVER.to_string(),
            format!("http://{}:{}", self.app_name, self.app_port),
        ]
    }
}
