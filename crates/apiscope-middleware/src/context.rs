//! Per-request state shared by the stages of a [`Pipeline`](crate::Pipeline).

use apiscope_core::RequestId;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// What the stages have learned about the request so far.
///
/// The request id stage fills in [`request_id`](Self::request_id), the
/// validation stage the resolved operation and a
/// [`ValidationOutcome`](crate::ValidationOutcome). Anything else is stored by
/// type.
///
/// ```
/// use apiscope_middleware::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_operation_id("searchPeople");
/// assert_eq!(ctx.operation_id(), Some("searchPeople"));
/// ```
#[derive(Debug, Default)]
pub struct MiddlewareContext {
    request_id: RequestId,
    operation_id: Option<String>,
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// A context with a freshly generated request id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context for a request that already carries an id.
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            ..Self::default()
        }
    }

    /// Id of the request being processed.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the request id.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// `operationId` of the matched route, once one was found.
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Records the matched route's `operationId`.
    pub fn set_operation_id(&mut self, operation_id: impl Into<String>) {
        self.operation_id = Some(operation_id.into());
    }

    /// Stores `value`, replacing any earlier value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// The stored value of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn take<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast().ok())
            .map(|value| *value)
    }
}
