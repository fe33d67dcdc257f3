//! Handler trait for request processing.
//!
//! The [`Handler`] trait is the single "handle one HTTP request" capability
//! that every apiscope component implements: the descriptor endpoint, the
//! validation middleware adapter and the sidecar's upstream proxy.

use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handles one HTTP request and produces one HTTP response.
///
/// Handlers are shared between tokio tasks, so implementations must be
/// `Send + Sync` and may be invoked concurrently.
///
/// # Example
///
/// ```
/// use apiscope_core::{BoxFuture, Handler, Request, Response};
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn call(&self, _request: Request) -> BoxFuture<'_, Response> {
///         Box::pin(async { Response::new(Full::new(Bytes::from_static(b"hello"))) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles a request and returns a response.
    fn call(&self, request: Request) -> BoxFuture<'_, Response>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        (**self).call(request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        (**self).call(request)
    }
}

/// Adapts an async closure into a [`Handler`].
///
/// ```
/// use apiscope_core::{FnHandler, Handler, Request, Response};
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// let handler = FnHandler::new(|_req: Request| async {
///     Response::new(Full::new(Bytes::from_static(b"ok")))
/// });
/// # let _ = handler;
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wraps the given closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin((self.f)(request))
    }
}
