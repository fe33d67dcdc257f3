//! Operational endpoints answered by the sidecar itself.

use apiscope_core::{BuildInfo, Response, ResponseExt};
use bytes::Bytes;
use http::StatusCode;

/// Path of the build information endpoint.
pub const BUILD_INFO_PATH: &str = "/__build-info";

/// Path of the good-to-go endpoint.
pub const GTG_PATH: &str = "/__gtg";

/// `200 OK` with the process build info as JSON.
pub fn build_info() -> Response {
    match serde_json::to_vec(BuildInfo::current()) {
        Ok(body) => Response::with_content("application/json", Bytes::from(body)),
        Err(e) => Response::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "BUILD_INFO_UNAVAILABLE",
            &e.to_string(),
        ),
    }
}

/// `200 OK` once the sidecar is serving.
pub fn good_to_go() -> Response {
    let mut response = Response::with_content(
        "text/plain; charset=US-ASCII",
        Bytes::from_static(b"OK"),
    );
    response.headers_mut().insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_build_info_is_json() {
        let response = build_info();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["version"], BuildInfo::current().version.as_str());
        assert!(json.get("dateTime").is_some());
    }

    #[tokio::test]
    async fn test_good_to_go() {
        let response = good_to_go();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("cache-control"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }
}
