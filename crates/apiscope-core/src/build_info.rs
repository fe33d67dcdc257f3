//! Process-wide build metadata.
//!
//! Build information is captured from the compile-time environment
//! (`APISCOPE_BUILD_VERSION`, `APISCOPE_BUILD_REPOSITORY`,
//! `APISCOPE_BUILD_REVISION`, `APISCOPE_BUILD_BUILDER`,
//! `APISCOPE_BUILD_DATE_TIME`) and read once per process. An embedding
//! binary may [`install`](BuildInfo::install) its own value before the first
//! read.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static BUILD_INFO: OnceLock<BuildInfo> = OnceLock::new();

/// Build metadata of the running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Release version, e.g. `2.1.0`.
    pub version: String,
    /// Source repository the build came from.
    pub repository: String,
    /// Source revision (commit hash).
    pub revision: String,
    /// Identity of the build system.
    pub builder: String,
    /// Build timestamp.
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

impl BuildInfo {
    /// Returns the process-wide build info, initializing it on first use.
    pub fn current() -> &'static Self {
        BUILD_INFO.get_or_init(Self::from_compile_env)
    }

    /// Installs the process-wide build info.
    ///
    /// Returns the rejected value if build info was already read or installed.
    pub fn install(info: Self) -> Result<(), Self> {
        BUILD_INFO.set(info)
    }

    /// Creates build info carrying only a version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            repository: String::new(),
            revision: String::new(),
            builder: String::new(),
            date_time: String::new(),
        }
    }

    fn from_compile_env() -> Self {
        Self {
            version: option_env!("APISCOPE_BUILD_VERSION")
                .unwrap_or(env!("CARGO_PKG_VERSION"))
                .to_string(),
            repository: option_env!("APISCOPE_BUILD_REPOSITORY")
                .unwrap_or(env!("CARGO_PKG_REPOSITORY"))
                .to_string(),
            revision: option_env!("APISCOPE_BUILD_REVISION")
                .unwrap_or_default()
                .to_string(),
            builder: option_env!("APISCOPE_BUILD_BUILDER")
                .unwrap_or_default()
                .to_string(),
            date_time: option_env!("APISCOPE_BUILD_DATE_TIME")
                .unwrap_or_default()
                .to_string(),
        }
    }
}
