//! HTTP message types shared by every handler.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type passed to handlers.
///
/// This is a standard `http::Request` with a fully buffered body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type returned by handlers.
///
/// This is a standard `http::Response` with a fully buffered body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building common responses.
pub trait ResponseExt {
    /// Creates a plain-text response with the given status code and message.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response with the `{"error": {code, message}}` envelope.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates a `200 OK` response with the given body and content type.
    fn with_content(content_type: &'static str, body: Bytes) -> Response;
}

impl ResponseExt for Response {
    fn error(status: StatusCode, message: &str) -> Response {
        let mut response = Self::new(Full::new(Bytes::from(message.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        let mut response = Self::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn with_content(content_type: &'static str, body: Bytes) -> Response {
        let mut response = Self::new(Full::new(body));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}
