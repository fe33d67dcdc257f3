//! # Apiscope Core
//!
//! Core types and traits shared by the apiscope crates.
//!
//! This crate provides the foundational types used throughout apiscope:
//!
//! - [`Handler`] - The "handle one HTTP request" capability
//! - [`Request`] / [`Response`] - Buffered HTTP message aliases
//! - [`BuildInfo`] - Process-wide, read-once build metadata
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/apiscope-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod build_info;
mod handler;
mod request_id;
mod types;

pub use build_info::BuildInfo;
pub use handler::{BoxFuture, FnHandler, Handler};
pub use request_id::{RequestId, X_REQUEST_ID};
pub use types::{Request, Response, ResponseExt};
