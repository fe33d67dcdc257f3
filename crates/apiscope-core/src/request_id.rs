//! Request identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Header that carries a [`RequestId`] to and from the application.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Identifies one request across the sidecar, the application and the logs.
///
/// Generated ids are UUID v7, so they sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// A new time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Reads an id from header text. Anything that is not a UUID is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// The wrapped UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ_and_are_v7() {
        let (a, b) = (RequestId::new(), RequestId::new());
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_parse_accepts_own_display() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&format!(" {id} ")), Some(id));
    }

    #[test]
    fn test_parse_rejects_non_uuid() {
        assert_eq!(RequestId::parse("req-42"), None);
        assert_eq!(RequestId::parse(""), None);
    }
}
