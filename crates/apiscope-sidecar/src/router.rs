//! Dispatches sidecar requests by path.
//!
//! | Path                 | Handler                                |
//! |----------------------|----------------------------------------|
//! | descriptor serve path| [`DescriptorEndpoint`]                 |
//! | `/__build-info`      | build info JSON                        |
//! | `/__gtg`             | `200 OK`                               |
//! | anything else        | the application pipeline               |

use std::sync::Arc;

use apiscope_core::{BoxFuture, Handler, Request, Response};
use apiscope_descriptor::DescriptorEndpoint;

use crate::health::{build_info, good_to_go, BUILD_INFO_PATH, GTG_PATH};

/// Routes a request to the descriptor, an operational endpoint or the app.
pub struct SidecarRouter {
    descriptor: DescriptorEndpoint,
    app: Arc<dyn Handler>,
}

impl std::fmt::Debug for SidecarRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarRouter")
            .field("serve_path", &self.descriptor.serve_path())
            .finish_non_exhaustive()
    }
}

impl SidecarRouter {
    /// Creates a router serving `descriptor` at its serve path and sending
    /// everything else to `app`.
    pub fn new(descriptor: DescriptorEndpoint, app: Arc<dyn Handler>) -> Self {
        Self { descriptor, app }
    }
}

impl Handler for SidecarRouter {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        let path = request.uri().path();

        if path == self.descriptor.serve_path() {
            return self.descriptor.call(request);
        }

        match path {
            BUILD_INFO_PATH => Box::pin(async { build_info() }),
            GTG_PATH => Box::pin(async { good_to_go() }),
            _ => self.app.call(request),
        }
    }
}
