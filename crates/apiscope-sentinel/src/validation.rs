//! Request validation against a resolved route.
//!
//! Parameters arrive as text. Each one is coerced according to its schema
//! type (integer, number, boolean, array) and then checked with the compiled
//! JSON Schema. A value that does not coerce is kept as a string, so the
//! schema reports the type mismatch.

use std::fmt;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, COOKIE};
use http::request::Parts;
use http::HeaderMap;
use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

use crate::document::ParameterIn;
use crate::error::{SentinelError, SentinelResult, ValidationError};
use crate::router::{is_json, Route, RouteMatch, RouteParameter};
use crate::schema::CompiledSchema;

/// What an [`Authenticator`] is asked to check.
#[derive(Debug)]
pub struct AuthenticationInput<'a> {
    /// Name of the security scheme, as declared under `securitySchemes`.
    pub scheme_name: &'a str,
    /// Scopes the requirement asks for.
    pub scopes: &'a [String],
    /// The matched route.
    pub route: &'a Route,
    /// The request head.
    pub parts: &'a Parts,
}

/// Checks a single security scheme of a request.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Returns `Err` with a reason when the scheme is not satisfied.
    fn authenticate(&self, input: &AuthenticationInput<'_>) -> Result<(), String>;
}

/// Accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthenticator;

impl Authenticator for NoopAuthenticator {
    fn authenticate(&self, _input: &AuthenticationInput<'_>) -> Result<(), String> {
        Ok(())
    }
}

/// Request validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Collect every violation instead of stopping at the first.
    pub multi_error: bool,
    /// Security scheme checker.
    pub authenticator: Arc<dyn Authenticator>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            multi_error: true,
            authenticator: Arc::new(NoopAuthenticator),
        }
    }
}

impl ValidationOptions {
    /// Sets multi-error collection.
    pub fn with_multi_error(mut self, multi_error: bool) -> Self {
        self.multi_error = multi_error;
        self
    }

    /// Sets the authenticator.
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }
}

struct Collector {
    multi_error: bool,
    errors: Vec<ValidationError>,
}

impl Collector {
    fn push(&mut self, error: ValidationError) {
        if self.multi_error || self.errors.is_empty() {
            self.errors.push(error);
        }
    }

    fn extend(&mut self, errors: Vec<ValidationError>) {
        for error in errors {
            self.push(error);
        }
    }

    fn done(&self) -> bool {
        !self.multi_error && !self.errors.is_empty()
    }
}

/// Validates a request against its matched route.
///
/// Checks path, query, header and cookie parameters, the body and the
/// security requirements. Every violation is returned in one
/// [`SentinelError::RequestValidation`].
pub fn validate_request(
    found: &RouteMatch<'_>,
    parts: &Parts,
    body: &[u8],
    options: &ValidationOptions,
) -> SentinelResult<()> {
    let route = found.route;
    let mut errors = Collector {
        multi_error: options.multi_error,
        errors: Vec::new(),
    };

    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let cookies = parse_cookies(&parts.headers);

    for param in &route.parameters {
        if errors.done() {
            break;
        }
        let raw: Vec<&str> = match param.location {
            ParameterIn::Path => found
                .path_params
                .get(&param.name)
                .map(String::as_str)
                .into_iter()
                .collect(),
            ParameterIn::Query => values_named(&query, &param.name),
            ParameterIn::Cookie => values_named(&cookies, &param.name),
            ParameterIn::Header => parts
                .headers
                .get_all(param.name.as_str())
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect(),
        };
        validate_parameter(param, &raw, &mut errors);
    }

    if !errors.done() {
        validate_body(route, &parts.headers, body, &mut errors);
    }
    if !errors.done() {
        validate_security(route, parts, options, &mut errors);
    }

    if errors.errors.is_empty() {
        debug!(route = %route.label(), "request is valid");
        Ok(())
    } else {
        Err(SentinelError::RequestValidation {
            route: route.label(),
            errors: errors.errors,
        })
    }
}

fn values_named<'a>(pairs: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .collect()
}

fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .collect()
}

fn validate_parameter(param: &RouteParameter, raw: &[&str], errors: &mut Collector) {
    let location = format!("{}.{}", param.location.as_str(), param.name);

    if raw.is_empty() {
        if param.required {
            errors.push(ValidationError::new(
                location,
                format!(
                    "missing required {} parameter '{}'",
                    param.location.as_str(),
                    param.name
                ),
            ));
        }
        return;
    }

    let Some(schema) = &param.schema else {
        return;
    };
    let value = coerce_parameter(param, schema, raw);
    errors.extend(schema.validate(&value, &location));
}

fn coerce_parameter(param: &RouteParameter, schema: &CompiledSchema, raw: &[&str]) -> Value {
    let first = raw.first().copied().unwrap_or_default();

    if param.json_content {
        return serde_json::from_str(first).unwrap_or_else(|_| Value::String(first.to_string()));
    }

    match schema.primary_type() {
        Some("array") => {
            let repeated = raw.len() > 1
                || (param.explode
                    && matches!(param.location, ParameterIn::Query | ParameterIn::Cookie));
            let items: Vec<&str> = if repeated {
                raw.to_vec()
            } else {
                first.split(delimiter(&param.style)).collect()
            };
            let item_type = schema.item_type();
            Value::Array(items.into_iter().map(|item| coerce_scalar(item, item_type)).collect())
        }
        Some("object") => {
            serde_json::from_str(first).unwrap_or_else(|_| Value::String(first.to_string()))
        }
        ty => coerce_scalar(first, ty),
    }
}

fn delimiter(style: &str) -> char {
    match style {
        "spaceDelimited" => ' ',
        "pipeDelimited" => '|',
        _ => ',',
    }
}

fn coerce_scalar(text: &str, ty: Option<&str>) -> Value {
    let coerced = match ty {
        Some("integer") => text.parse::<i64>().ok().map(Value::from),
        Some("number") => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Some("boolean") => match text {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    coerced.unwrap_or_else(|| Value::String(text.to_string()))
}

fn validate_body(route: &Route, headers: &HeaderMap, body: &[u8], errors: &mut Collector) {
    let Some(declared) = &route.request_body else {
        return;
    };

    if body.is_empty() {
        if declared.required {
            errors.push(ValidationError::new("body", "request body is required"));
        }
        return;
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let Some(content) = declared.content_for(content_type) else {
        errors.push(
            ValidationError::new(
                "body",
                format!("content type '{content_type}' is not accepted"),
            )
            .with_value(content_type),
        );
        return;
    };
    let Some(schema) = &content.schema else {
        return;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let value = if is_json(&essence) {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                errors.push(ValidationError::new("body", format!("invalid JSON: {e}")));
                return;
            }
        }
    } else if essence == "application/x-www-form-urlencoded" {
        form_object(body, schema)
    } else if schema.primary_type() == Some("string") {
        match std::str::from_utf8(body) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => return,
        }
    } else {
        debug!(content_type = %essence, "no schema check for media type");
        return;
    };

    errors.extend(schema.validate(&value, "body"));
}

fn form_object(body: &[u8], schema: &CompiledSchema) -> Value {
    let mut object = Map::new();

    for (key, value) in form_urlencoded::parse(body) {
        if schema.property_type(&key) == Some("array") {
            let item_type = schema.property_item_type(&key);
            let entry = object
                .entry(key.into_owned())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entry {
                items.push(coerce_scalar(&value, item_type));
            }
        } else {
            let coerced = coerce_scalar(&value, schema.property_type(&key));
            object.insert(key.into_owned(), coerced);
        }
    }

    Value::Object(object)
}

fn validate_security(
    route: &Route,
    parts: &Parts,
    options: &ValidationOptions,
    errors: &mut Collector,
) {
    if route.security.is_empty() {
        return;
    }

    // Requirements are alternatives; the schemes within one must all pass.
    let mut failures = Vec::new();
    for requirement in &route.security {
        let outcome = requirement.iter().try_for_each(|(name, scopes)| {
            options
                .authenticator
                .authenticate(&AuthenticationInput {
                    scheme_name: name,
                    scopes,
                    route,
                    parts,
                })
                .map_err(|reason| format!("{name}: {reason}"))
        });
        match outcome {
            Ok(()) => return,
            Err(reason) => failures.push(reason),
        }
    }

    errors.push(ValidationError::new(
        "security",
        format!("no security requirement satisfied ({})", failures.join("; ")),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ApiDocument;
    use crate::router::RouteTable;
    use http::Method;

    const DOC: &str = r##"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /things/{id}:
    get:
      parameters:
        - {name: id, in: path, required: true, schema: {type: integer, minimum: 1}}
        - {name: limit, in: query, required: true, schema: {type: integer, maximum: 50}}
        - {name: tags, in: query, schema: {type: array, items: {type: string, enum: [a, b]}}}
        - {name: ids, in: query, explode: false, schema: {type: array, items: {type: integer}}}
        - {name: X-Trace, in: header, schema: {type: string, minLength: 3}}
        - {name: session, in: cookie, required: true, schema: {type: string}}
        - name: filter
          in: query
          content:
            application/json:
              schema: {type: object, required: [field]}
      responses: {"200": {description: ok}}
  /things:
    post:
      security:
        - apiKey: []
        - oauth: [write]
      requestBody:
        required: true
        content:
          application/json:
            schema: {$ref: "#/components/schemas/Thing"}
          application/x-www-form-urlencoded:
            schema: {$ref: "#/components/schemas/Thing"}
          text/plain:
            schema: {type: string, maxLength: 5}
      responses: {"201": {description: created}}
components:
  schemas:
    Thing:
      type: object
      required: [title]
      properties:
        title: {type: string}
        count: {type: integer}
        nums: {type: array, items: {type: integer}}
"##;

    fn table() -> RouteTable {
        RouteTable::build(&ApiDocument::from_slice(DOC.as_bytes()).unwrap()).unwrap()
    }

    fn parts(method: Method, uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn check(
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: &[u8],
        options: &ValidationOptions,
    ) -> Vec<ValidationError> {
        let table = table();
        let parts = parts(method.clone(), uri, headers);
        let found = table.find_route(&method, None, parts.uri.path()).unwrap();
        match validate_request(&found, &parts, body, options) {
            Ok(()) => Vec::new(),
            Err(SentinelError::RequestValidation { errors, .. }) => errors,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    fn get(uri: &str, headers: &[(&str, &str)]) -> Vec<ValidationError> {
        check(Method::GET, uri, headers, b"", &ValidationOptions::default())
    }

    #[test]
    fn test_valid_parameters() {
        let errors = get(
            "/things/7?limit=10&tags=a&tags=b&ids=1,2,3&filter=%7B%22field%22%3A1%7D",
            &[("x-trace", "abcd"), ("cookie", "other=1; session=xyz")],
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_missing_required_parameters() {
        let errors = get("/things/7", &[]);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"query.limit"));
        assert!(paths.contains(&"cookie.session"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_type_and_constraint_violations() {
        let errors = get(
            "/things/0?limit=ten&tags=c&ids=1,x",
            &[("x-trace", "ab"), ("cookie", "session=1")],
        );
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"path.id"));
        assert!(paths.contains(&"query.limit"));
        assert!(paths.contains(&"query.tags/0"));
        assert!(paths.contains(&"query.ids/1"));
        assert!(paths.contains(&"header.X-Trace"));
    }

    #[test]
    fn test_json_content_parameter() {
        let errors = get(
            "/things/7?limit=1&filter=%7B%7D",
            &[("cookie", "session=1")],
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "query.filter");
    }

    #[test]
    fn test_single_error_mode_stops_early() {
        let options = ValidationOptions::default().with_multi_error(false);
        let errors = check(Method::GET, "/things/0?limit=ten", &[], b"", &options);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_json_body() {
        let json = [("content-type", "application/json")];
        let options = ValidationOptions::default();

        assert!(check(Method::POST, "/things", &json, br#"{"title":"x"}"#, &options).is_empty());

        let errors = check(Method::POST, "/things", &json, br#"{"count":1}"#, &options);
        assert_eq!(errors[0].path, "body");

        let errors = check(Method::POST, "/things", &json, b"{not json", &options);
        assert!(errors[0].message.contains("invalid JSON"));
    }

    #[test]
    fn test_missing_body_and_unknown_media_type() {
        let options = ValidationOptions::default();

        let errors = check(Method::POST, "/things", &[], b"", &options);
        assert_eq!(errors[0].message, "request body is required");

        let errors = check(
            Method::POST,
            "/things",
            &[("content-type", "image/png")],
            b"\x89PNG",
            &options,
        );
        assert!(errors[0].message.contains("not accepted"));
    }

    #[test]
    fn test_form_body_is_coerced() {
        let form = [("content-type", "application/x-www-form-urlencoded")];
        let options = ValidationOptions::default();

        assert!(check(Method::POST, "/things", &form, b"title=x&count=2&nums=1&nums=2", &options)
            .is_empty());

        let errors = check(Method::POST, "/things", &form, b"title=x&count=two", &options);
        assert_eq!(errors[0].path, "body/count");
    }

    #[test]
    fn test_text_body() {
        let text = [("content-type", "text/plain; charset=utf-8")];
        let options = ValidationOptions::default();

        assert!(check(Method::POST, "/things", &text, b"short", &options).is_empty());
        assert_eq!(
            check(Method::POST, "/things", &text, b"far too long", &options).len(),
            1
        );
    }

    #[derive(Debug)]
    struct OnlyOauth;

    impl Authenticator for OnlyOauth {
        fn authenticate(&self, input: &AuthenticationInput<'_>) -> Result<(), String> {
            if input.scheme_name == "oauth" && input.scopes.len() == 1 && input.scopes[0] == "write" {
                Ok(())
            } else {
                Err("denied".to_string())
            }
        }
    }

    #[derive(Debug)]
    struct DenyAll;

    impl Authenticator for DenyAll {
        fn authenticate(&self, _input: &AuthenticationInput<'_>) -> Result<(), String> {
            Err("denied".to_string())
        }
    }

    #[test]
    fn test_security_alternatives() {
        let json = [("content-type", "application/json")];
        let body = br#"{"title":"x"}"#;

        let options = ValidationOptions::default().with_authenticator(OnlyOauth);
        assert!(check(Method::POST, "/things", &json, body, &options).is_empty());

        let options = ValidationOptions::default().with_authenticator(DenyAll);
        let errors = check(Method::POST, "/things", &json, body, &options);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "security");
        assert!(errors[0].message.contains("apiKey: denied"));
        assert!(errors[0].message.contains("oauth: denied"));
    }

    #[test]
    fn test_coerce_scalar() {
        assert_eq!(coerce_scalar("12", Some("integer")), Value::from(12));
        assert_eq!(coerce_scalar("1.5", Some("number")), Value::from(1.5));
        assert_eq!(coerce_scalar("true", Some("boolean")), Value::Bool(true));
        assert_eq!(coerce_scalar("yes", Some("boolean")), Value::from("yes"));
        assert_eq!(coerce_scalar("12", None), Value::from("12"));
    }

    #[test]
    fn test_parse_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, "a=1; b=\"two\"".parse().unwrap());
        headers.append(COOKIE, "c=3".parse().unwrap());
        let cookies = parse_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }
}
