//! Header handling between the client, the sidecar and the upstream.

use http::header::{HeaderMap, HeaderName, CONNECTION, HOST};

/// Header carrying the host the client originally addressed.
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Hop-by-hop headers (RFC 7230 section 6.1), never forwarded in either direction.
pub static HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is hop-by-hop.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Copies `headers` without hop-by-hop headers.
///
/// Headers named in the `Connection` header are dropped as well.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name_str = name.as_str();
        if is_hop_by_hop(name_str) || connection_listed.iter().any(|c| c == name_str) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Builds the headers sent upstream.
///
/// Hop-by-hop headers are stripped and `Host` is replaced by the upstream's
/// own; the client's host moves to `X-Forwarded-Host` unless already set.
pub fn upstream_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut upstream = strip_hop_by_hop(headers);
    if let Some(host) = upstream.remove(HOST) {
        if !upstream.contains_key(&X_FORWARDED_HOST) {
            upstream.insert(X_FORWARDED_HOST.clone(), host);
        }
    }
    upstream
}

/// Builds the headers returned to the client.
pub fn client_response_headers(headers: &HeaderMap) -> HeaderMap {
    strip_hop_by_hop(headers)
}
