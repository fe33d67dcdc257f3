//! Sentinel error types.

use std::fmt;
use thiserror::Error;

/// Result type for Sentinel operations.
pub type SentinelResult<T> = Result<T, SentinelError>;

/// Errors that can occur while loading a document, building routes or
/// validating a request.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// The document could not be read or parsed.
    #[error("failed to load API document: {reason}")]
    Load {
        /// Why loading failed.
        reason: String,
    },

    /// The document is structurally or semantically invalid.
    #[error("invalid API document: {}", summarize(.problems))]
    SchemaInvalid {
        /// Every problem found.
        problems: Vec<String>,
    },

    /// The route table could not be compiled.
    #[error("failed to build router: {reason}")]
    RouterBuild {
        /// Why compilation failed.
        reason: String,
    },

    /// No route matches the request path.
    #[error("no route found for {method} {path}")]
    RouteNotFound {
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The path matches a route, but not for this method.
    #[error("method {method} not allowed for {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed {
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
        /// Methods declared for the path.
        allowed: Vec<String>,
    },

    /// The request violates the route's declared schema.
    #[error("request validation failed for {route}: {}", summarize_errors(.errors))]
    RequestValidation {
        /// The matched route, e.g. `GET /things/{uuid}`.
        route: String,
        /// Validation errors.
        errors: Vec<ValidationError>,
    },
}

impl SentinelError {
    /// Returns `true` for the route-resolution failures.
    pub fn is_route_miss(&self) -> bool {
        matches!(
            self,
            Self::RouteNotFound { .. } | Self::MethodNotAllowed { .. }
        )
    }
}

fn summarize(problems: &[String]) -> String {
    match problems {
        [] => "no problems recorded".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

fn summarize_errors(errors: &[ValidationError]) -> String {
    let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} error(s): {}", errors.len(), parts.join("; "))
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Location of the offending value, e.g. `query.limit` or `body/title`.
    pub path: String,
    /// Error message.
    pub message: String,
    /// Schema path that caused the error.
    pub schema_path: Option<String>,
    /// The invalid value (if available).
    pub value: Option<String>,
}

impl ValidationError {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            schema_path: None,
            value: None,
        }
    }

    pub(crate) fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref schema_path) = self.schema_path {
            write!(f, " (schema: {})", schema_path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = SentinelError::Load {
            reason: "file not found".to_string(),
        };
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_schema_invalid_summarizes() {
        let err = SentinelError::SchemaInvalid {
            problems: vec![
                "missing 'openapi'".to_string(),
                "missing 'info'".to_string(),
                "path 'x' must start with '/'".to_string(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("missing 'openapi'"));
        assert!(text.contains("2 more"));
    }

    #[test]
    fn test_route_not_found_display() {
        let err = SentinelError::RouteNotFound {
            method: "GET".to_string(),
            path: "/users".to_string(),
        };
        assert!(err.to_string().contains("GET"));
        assert!(err.to_string().contains("/users"));
        assert!(err.is_route_miss());
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let err = SentinelError::MethodNotAllowed {
            method: "DELETE".to_string(),
            path: "/users".to_string(),
            allowed: vec!["GET".to_string(), "POST".to_string()],
        };
        assert!(err.to_string().contains("GET, POST"));
        assert!(err.is_route_miss());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            path: "body/email".to_string(),
            message: "invalid email format".to_string(),
            schema_path: Some("/properties/email/format".to_string()),
            value: Some("not-an-email".to_string()),
        };
        assert!(err.to_string().contains("body/email"));
        assert!(err.to_string().contains("invalid email format"));
    }

    #[test]
    fn test_request_validation_display() {
        let err = SentinelError::RequestValidation {
            route: "POST /users".to_string(),
            errors: vec![ValidationError::new("query.limit", "is required")],
        };
        assert!(err.to_string().contains("POST /users"));
        assert!(err.to_string().contains("1 error"));
        assert!(!err.is_route_miss());
    }
}
