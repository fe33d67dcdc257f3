//! Sidecar HTTP server implementation.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use apiscope_config::ApiscopeConfig;
use apiscope_core::{Handler, Request, Response, ResponseExt};
use apiscope_descriptor::DescriptorEndpoint;
use apiscope_middleware::{Pipeline, RequestIdMiddleware, ValidationMiddleware};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::{request_timeout, shutdown_timeout, validator_config};
use crate::error::{SidecarError, SidecarResult};
use crate::proxy::UpstreamProxy;
use crate::router::SidecarRouter;

/// Sidecar server.
#[derive(Debug)]
pub struct SidecarServer {
    config: Arc<ApiscopeConfig>,
    handler: Arc<SidecarRouter>,
}

impl SidecarServer {
    /// Builds the descriptor endpoint, validation middleware and proxy.
    ///
    /// Fails when the descriptor cannot be loaded, or when validation is
    /// enabled and the document cannot be validated or compiled.
    pub fn new(config: ApiscopeConfig) -> SidecarResult<Self> {
        let descriptor = DescriptorEndpoint::from_file(&config.descriptor.path)?
            .with_serve_path(config.descriptor.serve_path.clone());

        let proxy = UpstreamProxy::new(config.application.upstream(), request_timeout(&config))?;
        let mut pipeline = Pipeline::new(proxy).with(RequestIdMiddleware::trust_incoming());
        if config.validation.enabled {
            pipeline = pipeline.with(ValidationMiddleware::new(&validator_config(&config))?);
        }
        debug!(stages = ?pipeline.stage_names(), "pipeline built");

        let handler = SidecarRouter::new(descriptor, Arc::new(pipeline));

        Ok(Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
        })
    }

    /// The request handler, for serving without a socket.
    pub fn handler(&self) -> Arc<SidecarRouter> {
        Arc::clone(&self.handler)
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(self) -> SidecarResult<()> {
        let addr: SocketAddr = self
            .config
            .server
            .http_addr
            .parse()
            .map_err(|e| SidecarError::server(format!("invalid listen address: {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SidecarError::server(format!("failed to bind {addr}: {e}")))?;

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves connections from `listener` until `shutdown` completes.
    ///
    /// In-flight connections get the configured shutdown timeout to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> SidecarResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            upstream = %self.config.application.upstream(),
            serve_path = %self.config.descriptor.serve_path,
            validation = self.config.validation.enabled,
            "apiscope sidecar listening"
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let handler = Arc::clone(&self.handler);
                    connections.spawn(serve_connection(stream, peer_addr, handler));
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        let grace = shutdown_timeout(&self.config);
        info!(
            in_flight = connections.len(),
            grace_secs = grace.as_secs(),
            "shutting down"
        );
        drain(connections, grace).await;
        Ok(())
    }
}

async fn drain(mut connections: JoinSet<()>, grace: Duration) {
    let finished = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(
            aborted = connections.len(),
            "shutdown timeout elapsed, aborting connections"
        );
        connections.abort_all();
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<SidecarRouter>,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request: http::Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, Infallible>(handle(handler.as_ref(), request, peer_addr).await) }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        debug!(error = %e, peer = %peer_addr, "connection error");
    }
}

/// Buffers the request body and hands the request to the router.
async fn handle(
    handler: &SidecarRouter,
    request: http::Request<Incoming>,
    peer_addr: SocketAddr,
) -> Response {
    let span = tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        peer = %peer_addr,
    );

    async move {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                return Response::json_error(
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    "failed to read request body",
                );
            }
        };

        handler.call(Request::from_parts(parts, Full::new(body))).await
    }
    .instrument(span)
    .await
}
