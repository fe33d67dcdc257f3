//! The stage abstraction used by [`Pipeline`](crate::Pipeline).
//!
//! A stage gets the request, may look at or change it, and hands it on
//! through [`Next`]. Whatever the rest of the chain returns comes back through
//! the same stage.
//!
//! ```ignore
//! use apiscope_core::{BoxFuture, Request, Response};
//! use apiscope_middleware::{Middleware, MiddlewareContext, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed_ms = start.elapsed().as_millis(), "handled");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use apiscope_core::{BoxFuture, Request, Response};

/// One stage of a [`Pipeline`](crate::Pipeline).
///
/// A stage either calls `next.run()` exactly once or answers the request
/// itself. The stages shipped here always call it.
pub trait Middleware: Send + Sync + 'static {
    /// Short stage name for logs, e.g. `"validation"`.
    fn name(&self) -> &'static str;

    /// Handles `request`, normally by passing it to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The rest of the chain: further stages, then the wrapped handler.
///
/// [`run`](Next::run) takes `self`, so the rest of the chain runs at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

/// Terminal step of a chain.
type Terminal<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>;

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Runs `middleware` with `next` as its continuation.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Ends the chain with `f`, usually a call into the wrapped handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Passes the request on.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Chain { middleware, next } => f
                .debug_struct("Next")
                .field("middleware", &middleware.name())
                .field("next", next)
                .finish(),
            NextInner::Handler(_) => f.write_str("Next(handler)"),
        }
    }
}
