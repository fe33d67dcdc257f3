//! # Apiscope Descriptor
//!
//! Serves a service's API descriptor (Swagger/OpenAPI, YAML or JSON) with the
//! environment-dependent fields rewritten for each request.
//!
//! The edge proxy in front of the service sets `X-Original-Request-URL` to the
//! URL the client asked for. From it the endpoint derives:
//!
//! - `host` - the URL host, with a non-default port
//! - `schemes` - always `["https"]`
//! - `basePath` - the URL path with the serving path (`/__api`) stripped
//! - `info.version` - the build version of the running process
//!
//! Without the header, the descriptor bytes are served unchanged.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apiscope_descriptor::{DescriptorEndpoint, DEFAULT_PATH};
//!
//! let endpoint = DescriptorEndpoint::from_file("api/api.yml")?;
//! // route DEFAULT_PATH to `endpoint` (it implements `apiscope_core::Handler`)
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod descriptor;
mod endpoint;
mod error;

pub use context::{strip_serve_path, RequestContext, X_ORIGINAL_REQUEST_URL};
pub use descriptor::{DerivedDescriptor, Descriptor, DescriptorFields, DescriptorFormat};
pub use endpoint::{DescriptorEndpoint, DEFAULT_PATH};
pub use error::{DescriptorError, DescriptorResult};
