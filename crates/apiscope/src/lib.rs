//! # Apiscope
//!
//! **OpenAPI descriptors served per caller, and requests checked against them.**
//!
//! - **Descriptor endpoint** – serves the API descriptor with `host`,
//!   `schemes`, `basePath` and `info.version` rewritten from the
//!   `X-Original-Request-URL` header
//! - **Validation middleware** – resolves every request against the OpenAPI
//!   document, logs route misses and schema violations, and always forwards
//! - **Structured logging and Prometheus metrics** through `tracing` and
//!   `metrics`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apiscope::prelude::*;
//!
//! let docs = DescriptorEndpoint::from_file("api/api.yml")?;
//!
//! let config = ValidatorConfig::new("api/openapi.yml", "people-api", 8080);
//! let app = Pipeline::new(app_handler)
//!     .with(RequestIdMiddleware::trust_incoming())
//!     .with(ValidationMiddleware::new(&config)?);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! GET /__api ─────────────────────────────► DescriptorEndpoint
//!
//! Request → RequestId → Validation ───────► Handler
//!                          │
//!                          └─ logs "failed to find route" /
//!                                  "failed to validate request"
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use apiscope_core as core;

// Re-export the descriptor endpoint
pub use apiscope_descriptor as descriptor;

// Re-export OpenAPI document, routing and validation
pub use apiscope_sentinel as sentinel;

// Re-export middleware types
pub use apiscope_middleware as middleware;

// Re-export logging and metrics
pub use apiscope_telemetry as telemetry;

// Re-export configuration
pub use apiscope_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use apiscope::prelude::*;
/// ```
pub mod prelude {
    pub use apiscope_core::{
        BoxFuture, BuildInfo, FnHandler, Handler, Request, RequestId, Response, ResponseExt,
    };

    pub use apiscope_descriptor::{DescriptorEndpoint, DescriptorError, DescriptorResult};

    pub use apiscope_sentinel::{
        SentinelError, SentinelResult, ValidationOptions, ValidatorConfig,
    };

    pub use apiscope_middleware::{
        Middleware, MiddlewareContext, Next, Pipeline, RequestIdMiddleware, ValidationMiddleware,
        ValidationOutcome,
    };
}
