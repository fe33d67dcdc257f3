//! HTTP endpoint serving the descriptor.

use crate::context::RequestContext;
use crate::descriptor::Descriptor;
use crate::error::DescriptorResult;
use apiscope_core::{BoxFuture, BuildInfo, Handler, Request, Response, ResponseExt};
use apiscope_telemetry::metrics::{
    record_descriptor_served, DESCRIPTOR_FALLBACK, DESCRIPTOR_ORIGINAL, DESCRIPTOR_REWRITTEN,
};
use bytes::Bytes;
use http::HeaderMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// The path the endpoint is expected to be served at.
pub const DEFAULT_PATH: &str = "/__api";

/// Serves an API descriptor with `host`, `schemes`, `basePath` and
/// `info.version` rewritten for each request.
///
/// Requests without a usable `X-Original-Request-URL` header get the
/// descriptor bytes exactly as loaded. Every response is `200 OK`.
///
/// # Example
///
/// ```rust,ignore
/// use apiscope_descriptor::DescriptorEndpoint;
///
/// let endpoint = DescriptorEndpoint::from_file("api/api.yml")?
///     .with_serve_path("/__api");
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorEndpoint {
    descriptor: Arc<Descriptor>,
    version: String,
    serve_path: String,
}

impl DescriptorEndpoint {
    /// Creates an endpoint for an already-parsed descriptor.
    ///
    /// The version written into `info.version` is read from [`BuildInfo::current`].
    pub fn new(descriptor: Descriptor) -> Self {
        let version = BuildInfo::current().version.clone();
        debug!(
            format = ?descriptor.format(),
            bytes = descriptor.raw().len(),
            version = %version,
            "descriptor endpoint created"
        );

        Self {
            descriptor: Arc::new(descriptor),
            version,
            serve_path: DEFAULT_PATH.to_string(),
        }
    }

    /// Reads the descriptor file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> DescriptorResult<Self> {
        Descriptor::from_file(path).map(Self::new)
    }

    /// Parses the descriptor from YAML (or JSON) bytes.
    pub fn from_yaml(bytes: impl Into<Bytes>) -> DescriptorResult<Self> {
        Descriptor::from_bytes(bytes).map(Self::new)
    }

    /// Overrides the version written into `info.version`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the serving path stripped from the request path to form `basePath`.
    #[must_use]
    pub fn with_serve_path(mut self, serve_path: impl Into<String>) -> Self {
        self.serve_path = serve_path.into();
        self
    }

    /// The serving path.
    pub fn serve_path(&self) -> &str {
        &self.serve_path
    }

    /// The version written into `info.version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The source descriptor.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Produces the response body for a request with the given headers.
    pub fn render(&self, headers: &HeaderMap) -> Bytes {
        let Some(context) = RequestContext::from_headers(headers) else {
            record_descriptor_served(DESCRIPTOR_ORIGINAL);
            return self.descriptor.raw().clone();
        };

        let derived = self
            .descriptor
            .derive(&context, &self.serve_path, &self.version);

        match derived.render() {
            Ok(body) => {
                record_descriptor_served(DESCRIPTOR_REWRITTEN);
                body
            }
            Err(err) => {
                warn!(
                    error = %err,
                    host = %context.host,
                    "failed to serialize derived descriptor, serving original"
                );
                record_descriptor_served(DESCRIPTOR_FALLBACK);
                self.descriptor.raw().clone()
            }
        }
    }
}

impl Handler for DescriptorEndpoint {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        let body = self.render(request.headers());
        let content_type = self.descriptor.format().content_type();
        Box::pin(async move { Response::with_content(content_type, body) })
    }
}
