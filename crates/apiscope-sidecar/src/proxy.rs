//! Forwards requests to the upstream application.

use std::time::{Duration, Instant};

use apiscope_core::{BoxFuture, Handler, Request, Response, ResponseExt};
use apiscope_telemetry::record_proxy_request;
use bytes::Bytes;
use http::uri::PathAndQuery;
use http_body_util::{BodyExt, Full};
use reqwest::Client;
use tracing::{debug, error};

use crate::error::{SidecarError, SidecarResult};
use crate::headers::{client_response_headers, upstream_request_headers};

/// Terminal handler that relays each request to the upstream application.
///
/// Upstream failures are answered with `502 Bad Gateway` and a JSON error
/// envelope.
#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    client: Client,
    upstream_url: String,
}

impl UpstreamProxy {
    /// Creates a proxy for `upstream_url` with the given round-trip timeout.
    pub fn new(upstream_url: impl Into<String>, timeout: Duration) -> SidecarResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| SidecarError::server(format!("failed to create client: {e}")))?;

        let upstream_url = upstream_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            upstream_url,
        })
    }

    /// The upstream base URL.
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Sends one request upstream and buffers the response.
    pub async fn forward(&self, request: Request) -> SidecarResult<Response> {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();

        let path = parts
            .uri
            .path_and_query()
            .map_or("/", PathAndQuery::as_str);
        let url = format!("{}{path}", self.upstream_url);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(upstream_request_headers(&parts.headers))
            .body(body)
            .send()
            .await
            .map_err(|e| SidecarError::upstream(format!("request to {url} failed: {e}")))?;

        let status = upstream.status();
        let headers = client_response_headers(upstream.headers());
        let body: Bytes = upstream
            .bytes()
            .await
            .map_err(|e| SidecarError::upstream(format!("failed to read body from {url}: {e}")))?;

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl Handler for UpstreamProxy {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            match self.forward(request).await {
                Ok(response) => {
                    let duration = start.elapsed();
                    record_proxy_request(response.status().as_u16(), duration);
                    debug!(
                        method = %method,
                        path = %path,
                        status = response.status().as_u16(),
                        duration_ms = duration.as_millis(),
                        "request proxied"
                    );
                    response
                }
                Err(err) => {
                    let duration = start.elapsed();
                    record_proxy_request(0, duration);
                    error!(
                        method = %method,
                        path = %path,
                        error = %err,
                        duration_ms = duration.as_millis(),
                        "proxy error"
                    );
                    Response::json_error(err.status_code(), err.code(), &err.to_string())
                }
            }
        })
    }
}
