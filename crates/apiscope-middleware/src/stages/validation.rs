//! Request validation middleware.
//!
//! Checks every request against the service's OpenAPI document and logs what
//! it finds. It never rejects: the request is always forwarded, unchanged, to
//! the next stage exactly once, and the response is passed back untouched.
//!
//! ```text
//! Request → resolve route ──miss──► log "failed to find route" ─────┐
//!                │                                                  │
//!                └─hit─► validate ──violation──► log "failed to     │
//!                           │                    validate request" ─┤
//!                           └─ok────────────────────────────────────┴─► next
//! ```

use std::sync::Arc;

use apiscope_core::{BoxFuture, Request, Response};
use apiscope_sentinel::{Sentinel, SentinelResult, ValidatorConfig};
use apiscope_telemetry::record_validation;
use bytes::Bytes;
use http::header::HOST;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use tracing::{debug, error};

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};

/// What validation concluded about a request.
///
/// Stored in the [`MiddlewareContext`] for later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The request matches its route's declaration.
    Passed,
    /// No route matched, so nothing was validated.
    RouteNotFound,
    /// The request violates its route's declaration.
    SchemaViolation,
}

impl ValidationOutcome {
    /// Label used in metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::RouteNotFound => "route_not_found",
            Self::SchemaViolation => "schema_violation",
        }
    }
}

/// Logs requests that do not match the OpenAPI document.
#[derive(Debug, Clone)]
pub struct ValidationMiddleware {
    sentinel: Arc<Sentinel>,
}

impl ValidationMiddleware {
    /// Loads, validates and compiles the configured document.
    ///
    /// Fails with `Load`, `SchemaInvalid` or `RouterBuild`.
    pub fn new(config: &ValidatorConfig) -> SentinelResult<Self> {
        let sentinel = Sentinel::from_config(config)?;
        debug!(
            file = %config.filename.display(),
            app_name = %config.app_name,
            app_port = config.app_port,
            "validation middleware ready"
        );
        Ok(Self::from_sentinel(Arc::new(sentinel)))
    }

    /// Wraps an already built sentinel.
    pub fn from_sentinel(sentinel: Arc<Sentinel>) -> Self {
        Self { sentinel }
    }

    /// The underlying sentinel.
    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    fn check(&self, ctx: &mut MiddlewareContext, parts: &Parts, body: &[u8]) -> ValidationOutcome {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()));
        let path = parts.uri.path();

        let found = match self.sentinel.find_route(&parts.method, host, path) {
            Ok(found) => found,
            Err(err) => {
                error!(
                    request_id = %ctx.request_id(),
                    method = %parts.method,
                    path,
                    host = host.unwrap_or_default(),
                    error = %err,
                    "failed to find route"
                );
                return ValidationOutcome::RouteNotFound;
            }
        };

        if let Some(operation_id) = &found.route.operation_id {
            ctx.set_operation_id(operation_id.clone());
        }

        match self.sentinel.validate(&found, parts, body) {
            Ok(()) => {
                debug!(
                    request_id = %ctx.request_id(),
                    route = %found.route.label(),
                    "request is valid"
                );
                ValidationOutcome::Passed
            }
            Err(err) => {
                error!(
                    request_id = %ctx.request_id(),
                    method = %parts.method,
                    path,
                    operation_id = ctx.operation_id().unwrap_or_default(),
                    error = %err,
                    "failed to validate request"
                );
                ValidationOutcome::SchemaViolation
            }
        }
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body: Bytes = body
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            let outcome = self.check(ctx, &parts, &body);
            record_validation(outcome.as_str());
            ctx.insert(outcome);

            next.run(ctx, Request::from_parts(parts, Full::new(body)))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ValidationOutcome::Passed.as_str(), "passed");
        assert_eq!(ValidationOutcome::RouteNotFound.as_str(), "route_not_found");
        assert_eq!(ValidationOutcome::SchemaViolation.as_str(), "schema_violation");
    }

    #[test]
    fn test_missing_document_fails_construction() {
        let config = ValidatorConfig::new("/nonexistent/openapi.yml", "app", 8080);
        let err = ValidationMiddleware::new(&config).unwrap_err();
        assert!(matches!(err, apiscope_sentinel::SentinelError::Load { .. }));
    }
}
