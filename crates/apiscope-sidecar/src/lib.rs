//! # Apiscope Sidecar
//!
//! A standalone binary that sits in front of an application and
//!
//! - serves the application's API descriptor with `host`, `schemes`,
//!   `basePath` and `info.version` rewritten for the caller,
//! - validates every other request against the OpenAPI document and logs
//!   violations,
//! - forwards those requests, unchanged, to the application.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Pod                               │
//! │                                                              │
//! │  ┌────────────────────────┐   HTTP   ┌────────────────────┐  │
//! │  │   apiscope-sidecar     │ ───────► │    Application     │  │
//! │  │                        │          │                    │  │
//! │  │  /__api   descriptor   │ ◄─────── │                    │  │
//! │  │  /__gtg   good to go   │          └────────────────────┘  │
//! │  │  /*       request id   │                                  │
//! │  │           validation   │                                  │
//! │  │           proxy        │                                  │
//! │  └────────────────────────┘                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! $ apiscope-sidecar --config /etc/apiscope/sidecar.toml
//!
//! $ APISCOPE__APPLICATION__NAME=people-api \
//!   APISCOPE__APPLICATION__PORT=8080 \
//!   APISCOPE__DESCRIPTOR__PATH=api/openapi.yml \
//!   apiscope-sidecar
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod headers;
pub mod health;
pub mod proxy;
pub mod router;
pub mod server;

pub use error::{SidecarError, SidecarResult};
pub use proxy::UpstreamProxy;
pub use router::SidecarRouter;
pub use server::SidecarServer;

/// Sidecar version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
