//! Per-request context derived from `X-Original-Request-URL`.

use http::HeaderMap;
use std::borrow::Cow;
use url::{ParseError, Url};

/// Header carrying the URL the client originally requested, as seen by the edge.
pub const X_ORIGINAL_REQUEST_URL: &str = "x-original-request-url";

/// Where the descriptor was requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Authority as written in the URL, without user info. Empty for
    /// references that carry no authority.
    pub host: String,
    /// Percent-decoded request path.
    pub path: String,
    /// Scheme advertised in the descriptor. Always `https`.
    pub scheme: &'static str,
}

impl RequestContext {
    /// Parses an absolute URL or a relative reference.
    ///
    /// Returns `None` for blank input and for text that is not a URL
    /// reference at all.
    pub fn from_url(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match Url::parse(raw) {
            Ok(url) => {
                let path = if url.cannot_be_a_base() {
                    String::new()
                } else {
                    decode_path(url.path())?
                };
                let host = raw
                    .split_once(':')
                    .and_then(|(_, rest)| rest.strip_prefix("//"))
                    .map_or(String::new(), authority);
                Some(Self::https(host, path))
            }
            Err(ParseError::RelativeUrlWithoutBase) => Self::from_reference(raw),
            Err(_) => None,
        }
    }

    /// A reference without a scheme: `/service/__api` or `//host/service/__api`.
    fn from_reference(raw: &str) -> Option<Self> {
        let reference = raw.split(['?', '#']).next().unwrap_or_default();

        if let Some(rest) = reference.strip_prefix("//") {
            let host = authority(rest);
            let path = rest.find('/').map_or("", |at| &rest[at..]);
            return Some(Self::https(host, decode_path(path)?));
        }

        let first_segment = reference.split('/').next().unwrap_or_default();
        if first_segment.contains(':') {
            return None;
        }

        // Resolving against a throwaway base rejects what a URL parser would.
        Url::parse("http://reference.invalid/")
            .ok()?
            .join(reference)
            .ok()?;

        Some(Self::https(String::new(), decode_path(reference)?))
    }

    fn https(host: String, path: String) -> Self {
        Self {
            host,
            path,
            scheme: "https",
        }
    }

    /// Reads the context from the `X-Original-Request-URL` header.
    ///
    /// Returns `None` when the header is absent, not visible ASCII, or not a
    /// URL reference.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(X_ORIGINAL_REQUEST_URL)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::from_url)
    }

    /// The `basePath` for this request given the endpoint's serving path.
    pub fn base_path(&self, serve_path: &str) -> String {
        strip_serve_path(&self.path, serve_path)
    }
}

/// The authority at the start of `rest` (the text after `//`), minus user info.
fn authority(rest: &str) -> String {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
        .to_string()
}

fn decode_path(path: &str) -> Option<String> {
    urlencoding::decode(path).ok().map(Cow::into_owned)
}

/// Strips `serve_path` from the end of `path`.
///
/// A path that does not end with `serve_path` yields `/`. A path that is
/// exactly `serve_path` yields the empty string.
pub fn strip_serve_path(path: &str, serve_path: &str) -> String {
    if serve_path.is_empty() {
        return "/".to_string();
    }

    match path.strip_suffix(serve_path) {
        Some(prefix) => prefix.to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    #[test]
    fn test_from_url_extracts_host_and_path() {
        let ctx = RequestContext::from_url("https://api.example.com/service/__api").unwrap();
        assert_eq!(ctx.host, "api.example.com");
        assert_eq!(ctx.path, "/service/__api");
        assert_eq!(ctx.scheme, "https");
    }

    #[test]
    fn test_from_url_keeps_explicit_port() {
        let ctx = RequestContext::from_url("http://api.example.com:8443/__api").unwrap();
        assert_eq!(ctx.host, "api.example.com:8443");
        assert_eq!(ctx.scheme, "https");
    }

    #[test]
    fn test_from_url_keeps_default_port_as_written() {
        let ctx = RequestContext::from_url("https://api.example.com:443/__api").unwrap();
        assert_eq!(ctx.host, "api.example.com:443");

        let ctx = RequestContext::from_url("https://ops@API.example.com/__api").unwrap();
        assert_eq!(ctx.host, "API.example.com");
    }

    #[test]
    fn test_from_url_accepts_relative_references() {
        let ctx = RequestContext::from_url("/service/__api?x=1").unwrap();
        assert_eq!(ctx.host, "");
        assert_eq!(ctx.path, "/service/__api");
        assert_eq!(ctx.base_path("/__api"), "/service");

        let ctx = RequestContext::from_url("//edge.example.com:8443/svc/__api").unwrap();
        assert_eq!(ctx.host, "edge.example.com:8443");
        assert_eq!(ctx.path, "/svc/__api");
    }

    #[test]
    fn test_from_url_opaque_url_has_no_host_or_path() {
        let ctx = RequestContext::from_url("mailto:ops@example.com").unwrap();
        assert_eq!(ctx.host, "");
        assert_eq!(ctx.base_path("/__api"), "/");
    }

    #[test]
    fn test_from_url_decodes_path() {
        let ctx = RequestContext::from_url("https://h.example.com/my%20svc/__api").unwrap();
        assert_eq!(ctx.base_path("/__api"), "/my svc");
    }

    #[test]
    fn test_from_url_rejects_blank_and_non_references() {
        assert!(RequestContext::from_url("   ").is_none());
        assert!(RequestContext::from_url("::not a url::").is_none());
        assert!(RequestContext::from_url("https://[::1/__api").is_none());
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(RequestContext::from_headers(&headers).is_none());

        headers.insert(
            X_ORIGINAL_REQUEST_URL,
            HeaderValue::from_static("https://api.example.com/x/__api"),
        );
        let ctx = RequestContext::from_headers(&headers).unwrap();
        assert_eq!(ctx.base_path("/__api"), "/x");
    }

    #[test]
    fn test_from_headers_rejects_opaque_bytes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_ORIGINAL_REQUEST_URL,
            HeaderValue::from_bytes(b"https://h\xfa/__api").unwrap(),
        );
        assert!(RequestContext::from_headers(&headers).is_none());
    }

    #[test]
    fn test_strip_serve_path() {
        assert_eq!(strip_serve_path("/service/__api", "/__api"), "/service");
        assert_eq!(strip_serve_path("/service/docs", "/__api"), "/");
        assert_eq!(strip_serve_path("/__api", "/__api"), "");
        assert_eq!(strip_serve_path("/a/b/__api", "/__api"), "/a/b");
        assert_eq!(strip_serve_path("/a", ""), "/");
    }

    proptest! {
        #[test]
        fn prop_suffix_is_stripped(prefix in "(/[a-z0-9_-]{1,8}){1,4}") {
            let path = format!("{prefix}/__api");
            prop_assert_eq!(strip_serve_path(&path, "/__api"), prefix);
        }

        #[test]
        fn prop_non_suffix_paths_collapse_to_root(path in "(/[a-z0-9]{1,8}){0,4}") {
            prop_assume!(!path.ends_with("/__api"));
            prop_assert_eq!(strip_serve_path(&path, "/__api"), "/");
        }
    }
}
