//! Error types for the descriptor crate.

use thiserror::Error;

/// Errors that can occur while loading or rendering a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor could not be read or parsed, or is not a mapping with an `info` mapping.
    #[error("Failed to load descriptor: {reason}")]
    Load {
        /// Why loading failed.
        reason: String,
    },

    /// A derived descriptor could not be serialized.
    #[error("Failed to serialize descriptor: {reason}")]
    Serialize {
        /// Why serialization failed.
        reason: String,
    },
}

impl DescriptorError {
    pub(crate) fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }
}

impl From<serde_yaml::Error> for DescriptorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialize {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DescriptorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize {
            reason: err.to_string(),
        }
    }
}

/// Result type for descriptor operations.
pub type DescriptorResult<T> = Result<T, DescriptorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_mentions_reason() {
        let err = DescriptorError::load("top level is not a mapping");
        assert!(err.to_string().contains("top level is not a mapping"));
    }

    #[test]
    fn test_json_error_converts_to_serialize() {
        let err: DescriptorError = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, DescriptorError::Serialize { .. }));
    }
}
