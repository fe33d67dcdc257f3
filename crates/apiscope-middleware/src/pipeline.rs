//! A handler wrapped in an ordered list of middleware.

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};
use apiscope_core::{BoxFuture, Handler, Request, Response};
use std::sync::Arc;

type BoxedMiddleware = Arc<dyn Middleware>;

/// Runs a request through middleware, in the order added, then the handler.
///
/// A `Pipeline` is itself a [`Handler`], so it can be served directly or
/// wrapped again.
///
/// ```ignore
/// let pipeline = Pipeline::new(proxy)
///     .with(RequestIdMiddleware::trust_incoming())
///     .with(ValidationMiddleware::new(&config)?);
/// ```
pub struct Pipeline<H> {
    middleware: Vec<BoxedMiddleware>,
    handler: Arc<H>,
}

impl<H> std::fmt::Debug for Pipeline<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<H: Handler> Pipeline<H> {
    /// Creates a pipeline with no middleware.
    pub fn new(handler: H) -> Self {
        Self {
            middleware: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Appends a middleware stage.
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends a shared middleware stage.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Processes a request with a caller-provided context.
    pub async fn process(&self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        let handler = Arc::clone(&self.handler);
        let mut next = Next::handler(move |_ctx, request| {
            Box::pin(async move { handler.call(request).await })
        });

        for middleware in self.middleware.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next.run(ctx, request).await
    }

    /// Returns the names of all middleware stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl<H: Handler> Handler for Pipeline<H> {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut ctx = MiddlewareContext::new();
            self.process(&mut ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiscope_core::FnHandler;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::{BodyExt, Full};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A test middleware that records its invocation order.
    struct OrderTrackingMiddleware {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.order.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::from("payload")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let handler_calls = Arc::clone(&calls);
        let handler = FnHandler::new(move |request: Request| {
            let calls = Arc::clone(&handler_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let body = request.into_body().collect().await.unwrap().to_bytes();
                Response::new(Full::new(body))
            }
        });

        let pipeline = Pipeline::new(handler)
            .with(OrderTrackingMiddleware {
                name: "first",
                order: Arc::clone(&order),
            })
            .with(OrderTrackingMiddleware {
                name: "second",
                order: Arc::clone(&order),
            });

        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);

        let response = pipeline.call(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"payload");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let handler = FnHandler::new(|_request: Request| async {
            Response::new(Full::new(Bytes::from("handler")))
        });
        let pipeline = Pipeline::new(handler);

        let mut ctx = MiddlewareContext::new();
        let response = pipeline.process(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(pipeline.stage_names().is_empty());
    }
}
