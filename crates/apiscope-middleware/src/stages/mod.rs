//! Middleware stages.
//!
//! 1. [`request_id`] - Generate/propagate request ID
//! 2. [`validation`] - Log requests that violate the OpenAPI document

pub mod request_id;
pub mod validation;

pub use request_id::RequestIdMiddleware;
pub use validation::{ValidationMiddleware, ValidationOutcome};
