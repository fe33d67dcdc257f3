//! # Apiscope Middleware
//!
//! Middleware for apiscope handlers.
//!
//! A [`Pipeline`] wraps any [`apiscope_core::Handler`] in an ordered list of
//! [`Middleware`] stages and is itself a handler:
//!
//! ```text
//! Request → RequestId → Validation → Handler
//!                                       ↓
//! Response ← RequestId ←────────────────┘
//! ```
//!
//! | Stage      | Middleware                   | Purpose                                  |
//! |------------|------------------------------|------------------------------------------|
//! | request_id | [`RequestIdMiddleware`]      | Generate/propagate request ID (UUID v7)  |
//! | validation | [`ValidationMiddleware`]     | Log requests violating the OpenAPI document |
//!
//! ## Example
//!
//! ```ignore
//! use apiscope_middleware::{Pipeline, ValidationMiddleware};
//! use apiscope_sentinel::ValidatorConfig;
//!
//! let config = ValidatorConfig::new("api/openapi.yml", "people-api", 8080);
//! let handler = Pipeline::new(app).with(ValidationMiddleware::new(&config)?);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use context::MiddlewareContext;
pub use middleware::{Middleware, Next};
pub use pipeline::Pipeline;
pub use stages::{RequestIdMiddleware, ValidationMiddleware, ValidationOutcome};
