//! Stamps every request with an `x-request-id`.
//!
//! The id ends up in the [`MiddlewareContext`], on the request handed to the
//! next stage and on the response, so the sidecar's logs, the application's
//! logs and the client all see the same value.

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};
use apiscope_core::{BoxFuture, Request, RequestId, Response, X_REQUEST_ID};
use http::HeaderValue;

/// Assigns a [`RequestId`] to each request.
///
/// By default a fresh UUID v7 is always generated. With
/// [`trust_incoming`](Self::trust_incoming) an incoming `x-request-id` that
/// parses as a UUID is reused instead.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    reuse_incoming: bool,
}

impl RequestIdMiddleware {
    /// Always generates a new id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses a valid incoming id, generating one only when it is missing.
    pub fn trust_incoming() -> Self {
        Self {
            reuse_incoming: true,
        }
    }

    fn incoming(&self, request: &Request) -> Option<RequestId> {
        if !self.reuse_incoming {
            return None;
        }
        let value = request.headers().get(X_REQUEST_ID)?;
        RequestId::parse(value.to_str().ok()?)
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = self.incoming(&request).unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);

            let value = HeaderValue::from_str(&request_id.to_string()).ok();
            if let Some(value) = &value {
                request.headers_mut().insert(X_REQUEST_ID, value.clone());
            }

            let mut response = next.run(ctx, request).await;

            if let Some(value) = value {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
            response
        })
    }
}
