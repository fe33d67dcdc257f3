//! # Apiscope Sentinel
//!
//! OpenAPI 3 aware request checking: loads a document, validates it, compiles
//! its routes and validates requests against them.
//!
//! # Overview
//!
//! - [`ApiDocument`] parses YAML or JSON and reports every structural problem
//! - [`RouteTable`] maps method, host and path to an operation
//! - [`validate_request`] checks parameters, body and security of a request
//!
//! ```text
//!   openapi.yml ──► ApiDocument ──validate──► RouteTable
//!                                                 │
//!   HTTP request ─── method, host, path ─────► find_route ──► RouteMatch
//!                                                                 │
//!                              parts + body ──► validate_request ◄┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use apiscope_sentinel::{Sentinel, ValidatorConfig};
//!
//! let sentinel = Sentinel::from_config(&ValidatorConfig::new("api/openapi.yml", "people-api", 8080))?;
//! let found = sentinel.find_route(&parts.method, host, parts.uri.path())?;
//! sentinel.validate(&found, &parts, &body)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod error;
pub mod router;
pub mod schema;
pub mod validation;

pub use config::ValidatorConfig;
pub use document::{ApiDocument, OpenApiDocument, Server};
pub use error::{SentinelError, SentinelResult, ValidationError};
pub use router::{Route, RouteMatch, RouteTable};
pub use validation::{
    validate_request, AuthenticationInput, Authenticator, NoopAuthenticator, ValidationOptions,
};

use http::request::Parts;
use http::Method;
use tracing::debug;

/// A loaded, validated document with its compiled route table.
#[derive(Debug)]
pub struct Sentinel {
    document: ApiDocument,
    routes: RouteTable,
    options: ValidationOptions,
}

impl Sentinel {
    /// Loads the configured document and prepares it for request checking.
    ///
    /// The application's own addresses are registered as servers, so requests
    /// sent to it directly resolve like requests through the public host.
    pub fn from_config(config: &ValidatorConfig) -> SentinelResult<Self> {
        let document = ApiDocument::from_file(&config.filename)?;
        Self::with_document(document, config)
    }

    /// Like [`from_config`](Self::from_config), from an already parsed document.
    pub fn with_document(mut document: ApiDocument, config: &ValidatorConfig) -> SentinelResult<Self> {
        for url in config.synthetic_servers() {
            document.add_server(Server::new(url));
        }

        document.validate()?;
        let routes = RouteTable::build(&document)?;

        debug!(
            file = %config.filename.display(),
            routes = routes.len(),
            "sentinel initialized"
        );

        Ok(Self {
            document,
            routes,
            options: config.options.clone(),
        })
    }

    /// Resolves a request to a route.
    pub fn find_route(
        &self,
        method: &Method,
        host: Option<&str>,
        path: &str,
    ) -> SentinelResult<RouteMatch<'_>> {
        self.routes.find_route(method, host, path)
    }

    /// Validates a request against a resolved route.
    pub fn validate(&self, found: &RouteMatch<'_>, parts: &Parts, body: &[u8]) -> SentinelResult<()> {
        validate_request(found, parts, body, &self.options)
    }

    /// The loaded document.
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// The compiled routes.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}
