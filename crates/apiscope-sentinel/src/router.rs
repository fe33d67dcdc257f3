//! Route resolution from HTTP requests.
//!
//! The [`RouteTable`] maps a request's method, host and path to a declared
//! operation and extracts its path parameters. Every parameter and request
//! body schema is compiled once, when the table is built.

use std::collections::HashMap;

use http::Method;
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::document::{
    ApiDocument, Operation, Parameter, ParameterIn, PathItem, RefOr, SecurityRequirement,
};
use crate::error::{SentinelError, SentinelResult};
use crate::schema::{CompiledSchema, SchemaResolver};

/// A resolved operation with everything request validation needs.
#[derive(Debug)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// Path template, e.g. `/things/{uuid}`.
    pub template: String,
    /// Operation id, if declared.
    pub operation_id: Option<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
    /// Path-item and operation parameters, merged.
    pub parameters: Vec<RouteParameter>,
    /// Request body, if declared.
    pub request_body: Option<RouteBody>,
    /// Effective security requirements (alternatives).
    pub security: Vec<SecurityRequirement>,
}

impl Route {
    /// `METHOD /template`, used in logs and errors.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.template)
    }
}

/// A parameter with its compiled schema.
#[derive(Debug)]
pub struct RouteParameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter is read from.
    pub location: ParameterIn,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Serialization style (`form`, `simple`, ...).
    pub style: String,
    /// Whether arrays are sent as repeated values.
    pub explode: bool,
    /// Compiled schema, if any.
    pub schema: Option<CompiledSchema>,
    /// Whether the value is JSON text (`content: application/json`).
    pub json_content: bool,
}

/// A request body declaration.
#[derive(Debug)]
pub struct RouteBody {
    /// Whether a body must be sent.
    pub required: bool,
    /// Accepted media types in declaration order.
    pub content: Vec<BodyContent>,
}

/// One accepted media type of a request body.
#[derive(Debug)]
pub struct BodyContent {
    /// Media type or range, lowercased (`application/json`, `text/*`).
    pub media_type: String,
    /// Compiled schema, if any.
    pub schema: Option<CompiledSchema>,
}

impl RouteBody {
    /// Finds the declared media type for a `Content-Type` value.
    ///
    /// Exact matches win over `type/*`, which wins over `*/*`.
    pub fn content_for(&self, content_type: &str) -> Option<&BodyContent> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let range = essence
            .split_once('/')
            .map(|(top, _)| format!("{top}/*"));

        self.content
            .iter()
            .find(|c| c.media_type == essence)
            .or_else(|| {
                range
                    .as_deref()
                    .and_then(|range| self.content.iter().find(|c| c.media_type == range))
            })
            .or_else(|| self.content.iter().find(|c| c.media_type == "*/*"))
    }
}

/// A successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Path parameters by name, percent-decoded.
    pub path_params: HashMap<String, String>,
}

/// Host, port and base path a server entry contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerMatcher {
    host: Option<String>,
    port: Option<u16>,
    base_path: String,
}

impl ServerMatcher {
    fn parse(url: &str) -> SentinelResult<Self> {
        if url.starts_with('/') {
            return Ok(Self {
                host: None,
                port: None,
                base_path: url.trim_end_matches('/').to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| SentinelError::RouterBuild {
            reason: format!("server url '{url}': {e}"),
        })?;
        Ok(Self {
            host: parsed.host_str().map(str::to_ascii_lowercase),
            port: parsed.port_or_known_default(),
            base_path: parsed.path().trim_end_matches('/').to_string(),
        })
    }

    fn matches_host(&self, request: Option<(String, Option<u16>)>) -> bool {
        let Some(host) = &self.host else {
            return true;
        };
        let Some((request_host, request_port)) = request else {
            return false;
        };
        if *host != request_host {
            return false;
        }
        match (request_port, self.port) {
            (Some(request_port), Some(port)) => request_port == port,
            (None, Some(port)) => port == 80 || port == 443,
            (_, None) => true,
        }
    }

    /// The path relative to the base path, if the path lies under it.
    fn strip_base<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.base_path.as_str())?;
        match rest {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

/// Splits a `Host` value into a lowercased host and an optional port.
fn split_host(host: &str) -> (String, Option<u16>) {
    let host = host.trim().to_ascii_lowercase();
    // Bracketed IPv6 literals keep their colons.
    let port_sep = if host.starts_with('[') {
        host.rfind("]:").map(|i| i + 1)
    } else {
        host.rfind(':')
    };

    if let Some(i) = port_sep {
        if let Ok(port) = host[i + 1..].parse::<u16>() {
            return (host[..i].to_string(), Some(port));
        }
    }
    (host, None)
}

/// A compiled route for efficient matching.
#[derive(Debug)]
struct CompiledRoute {
    pattern: Regex,
    param_names: Vec<String>,
    route: Route,
}

/// Routes of one API document, indexed by method.
#[derive(Debug)]
pub struct RouteTable {
    servers: Vec<ServerMatcher>,
    routes: HashMap<Method, Vec<CompiledRoute>>,
}

impl RouteTable {
    /// Compiles the routes of a document.
    ///
    /// A document without servers is served from the root of any host.
    pub fn build(document: &ApiDocument) -> SentinelResult<Self> {
        let openapi = document.openapi();
        let resolver = SchemaResolver::new(document.raw());

        let mut servers = Vec::new();
        for server in &openapi.servers {
            let matcher = ServerMatcher::parse(&server.resolved_url())?;
            if !servers.contains(&matcher) {
                servers.push(matcher);
            }
        }

        let mut routes: HashMap<Method, Vec<CompiledRoute>> = HashMap::new();
        for (template, item) in &openapi.paths {
            let (pattern, param_names) = compile_path(template)?;

            for (method, operation) in item.operations() {
                let route = build_route(document, &resolver, template, item, method, operation)?;
                routes
                    .entry(route.method.clone())
                    .or_default()
                    .push(CompiledRoute {
                        pattern: pattern.clone(),
                        param_names: param_names.clone(),
                        route,
                    });
            }
        }

        for method_routes in routes.values_mut() {
            method_routes.sort_by(|a, b| route_specificity(&a.route.template, &b.route.template));
        }

        debug!(
            servers = servers.len(),
            methods = routes.len(),
            total_routes = routes.values().map(Vec::len).sum::<usize>(),
            "route table built"
        );

        Ok(Self { servers, routes })
    }

    /// Finds the route for a request.
    ///
    /// `host` is the request's `Host` value, port included if sent.
    pub fn find_route(
        &self,
        method: &Method,
        host: Option<&str>,
        path: &str,
    ) -> SentinelResult<RouteMatch<'_>> {
        let candidates = self.relative_paths(host, path);

        if let Some(routes) = self.routes.get(method) {
            for relative in &candidates {
                if let Some(found) = match_routes(routes, relative) {
                    return Ok(found);
                }
            }
        }

        let mut allowed: Vec<String> = self
            .routes
            .iter()
            .filter(|(other, _)| *other != method)
            .filter(|(_, routes)| {
                candidates
                    .iter()
                    .any(|relative| match_routes(routes, relative).is_some())
            })
            .map(|(other, _)| other.to_string())
            .collect();

        if allowed.is_empty() {
            return Err(SentinelError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        allowed.sort();
        Err(SentinelError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
            allowed,
        })
    }

    /// Number of compiled routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Returns `true` if the document declares no operations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path templates registered for a method.
    pub fn routes_for_method(&self, method: &Method) -> Vec<&str> {
        self.routes
            .get(method)
            .map(|routes| routes.iter().map(|r| r.route.template.as_str()).collect())
            .unwrap_or_default()
    }

    fn relative_paths<'p>(&self, host: Option<&str>, path: &'p str) -> Vec<&'p str> {
        if self.servers.is_empty() {
            return vec![path];
        }

        let request_host = host.map(split_host);
        let mut paths = Vec::new();
        for server in &self.servers {
            if !server.matches_host(request_host.clone()) {
                continue;
            }
            if let Some(relative) = server.strip_base(path) {
                if !paths.contains(&relative) {
                    paths.push(relative);
                }
            }
        }
        paths
    }
}

fn match_routes<'a>(routes: &'a [CompiledRoute], path: &str) -> Option<RouteMatch<'a>> {
    routes.iter().find_map(|compiled| {
        let captures = compiled.pattern.captures(path)?;
        let path_params = compiled
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let raw = captures.get(i + 1)?.as_str();
                // Escapes that do not decode to UTF-8 are kept as sent.
                let value = urlencoding::decode(raw)
                    .map_or_else(|_| raw.to_string(), |v| v.into_owned());
                Some((name.clone(), value))
            })
            .collect();
        Some(RouteMatch {
            route: &compiled.route,
            path_params,
        })
    })
}

fn build_route(
    document: &ApiDocument,
    resolver: &SchemaResolver,
    template: &str,
    item: &PathItem,
    method: Method,
    operation: &Operation,
) -> SentinelResult<Route> {
    let label = format!("{method} {template}");

    // Operation parameters override path-item ones with the same name and location.
    let mut merged: IndexMap<(String, ParameterIn), &Parameter> = IndexMap::new();
    for entry in item.parameters.iter().chain(operation.parameters.iter()) {
        let param = resolve_parameter(document, entry, &label)?;
        let (Some(name), Some(location)) = (param.name.as_ref(), param.parsed_location()) else {
            return Err(SentinelError::RouterBuild {
                reason: format!("{label}: parameter without a name or location"),
            });
        };
        merged.insert((name.clone(), location), param);
    }

    let mut parameters = Vec::with_capacity(merged.len());
    for ((name, location), param) in merged {
        parameters.push(compile_parameter(resolver, &label, name, location, param)?);
    }

    let request_body = match &operation.request_body {
        None => None,
        Some(entry) => {
            let body = document
                .request_body(entry)
                .ok_or_else(|| SentinelError::RouterBuild {
                    reason: format!("{label}: request body reference does not resolve"),
                })?;
            let mut content = Vec::with_capacity(body.content.len());
            for (media_type, media) in &body.content {
                let schema = media
                    .schema
                    .as_ref()
                    .map(|schema| compile(resolver, &label, schema))
                    .transpose()?;
                content.push(BodyContent {
                    media_type: media_type.to_ascii_lowercase(),
                    schema,
                });
            }
            Some(RouteBody {
                required: body.required,
                content,
            })
        }
    };

    let security = operation
        .security
        .clone()
        .unwrap_or_else(|| document.openapi().security.clone());

    Ok(Route {
        method,
        template: template.to_string(),
        operation_id: operation.operation_id.clone(),
        deprecated: operation.deprecated,
        parameters,
        request_body,
        security,
    })
}

fn resolve_parameter<'a>(
    document: &'a ApiDocument,
    entry: &'a RefOr<Parameter>,
    label: &str,
) -> SentinelResult<&'a Parameter> {
    document
        .parameter(entry)
        .ok_or_else(|| SentinelError::RouterBuild {
            reason: format!("{label}: parameter reference does not resolve"),
        })
}

fn compile_parameter(
    resolver: &SchemaResolver,
    label: &str,
    name: String,
    location: ParameterIn,
    param: &Parameter,
) -> SentinelResult<RouteParameter> {
    let style = param.style.clone().unwrap_or_else(|| {
        match location {
            ParameterIn::Query | ParameterIn::Cookie => "form",
            ParameterIn::Path | ParameterIn::Header => "simple",
        }
        .to_string()
    });
    let explode = param.explode.unwrap_or(style == "form");

    let (schema, json_content) = match (&param.schema, param.content.first()) {
        (Some(schema), _) => (Some(schema), false),
        (None, Some((media_type, media))) => (media.schema.as_ref(), is_json(media_type)),
        (None, None) => (None, false),
    };
    let schema = schema
        .map(|schema| compile(resolver, label, schema))
        .transpose()?;

    Ok(RouteParameter {
        name,
        location,
        required: param.required || location == ParameterIn::Path,
        style,
        explode,
        schema,
        json_content,
    })
}

fn compile(
    resolver: &SchemaResolver,
    label: &str,
    schema: &serde_json::Value,
) -> SentinelResult<CompiledSchema> {
    resolver
        .compile(schema)
        .map_err(|reason| SentinelError::RouterBuild {
            reason: format!("{label}: {reason}"),
        })
}

/// Returns `true` for `application/json` and `+json` media types.
pub(crate) fn is_json(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json")
}

fn compile_path(template: &str) -> SentinelResult<(Regex, Vec<String>)> {
    let invalid = |reason: &str| SentinelError::RouterBuild {
        reason: format!("path '{template}': {reason}"),
    };

    let mut pattern = String::from("^");
    let mut param_names = Vec::new();

    for segment in template.split('/').filter(|s| !s.is_empty()) {
        pattern.push('/');

        let mut rest = segment;
        while let Some(start) = rest.find('{') {
            let end = rest[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| invalid("unbalanced '{'"))?;
            pattern.push_str(&regex::escape(&rest[..start]));
            param_names.push(rest[start + 1..end].to_string());
            // Match any non-slash characters
            pattern.push_str("([^/]+)");
            rest = &rest[end + 1..];
        }
        pattern.push_str(&regex::escape(rest));
    }

    if pattern == "^" {
        pattern.push('/');
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
    Ok((regex, param_names))
}

/// Compare route specificity for sorting.
/// More specific routes (fewer parameters, longer templates) come first.
fn route_specificity(a: &str, b: &str) -> std::cmp::Ordering {
    let a_params = a.matches('{').count();
    let b_params = b.matches('{').count();

    if a_params != b_params {
        return a_params.cmp(&b_params);
    }

    b.len().cmp(&a.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Server;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
servers:
  - url: https://api.example.com/v1
security:
  - apiKey: []
paths:
  /users:
    get:
      operationId: listUsers
      responses: {"200": {description: ok}}
    post:
      operationId: createUser
      security: []
      requestBody:
        required: true
        content:
          application/json:
            schema: {type: object}
          text/*: {}
      responses: {"201": {description: created}}
  /users/{userId}:
    parameters:
      - {name: userId, in: path, required: true, schema: {type: string}}
      - {name: verbose, in: query, schema: {type: boolean}}
    get:
      operationId: getUser
      parameters:
        - {name: verbose, in: query, required: true, schema: {type: boolean}}
      responses: {"200": {description: ok}}
  /users/me:
    get:
      operationId: getMe
      responses: {"200": {description: ok}}
  /users/{userId}/orders:
    get:
      operationId: getUserOrders
      deprecated: true
      responses: {"200": {description: ok}}
  /files/{name}.json:
    get:
      operationId: getFile
      parameters:
        - {name: name, in: path, required: true, schema: {type: string}}
        - {name: ids, in: query, schema: {type: array, items: {type: integer}}}
      responses: {"200": {description: ok}}
"#;

    fn table_with(extra: &[&str]) -> RouteTable {
        let mut doc = ApiDocument::from_slice(DOC.as_bytes()).unwrap();
        for url in extra {
            doc.add_server(Server::new(*url));
        }
        RouteTable::build(&doc).unwrap()
    }

    fn operation(table: &RouteTable, method: Method, host: &str, path: &str) -> Option<String> {
        table
            .find_route(&method, Some(host), path)
            .ok()
            .and_then(|m| m.route.operation_id.clone())
    }

    #[test]
    fn test_resolve_simple_path() {
        let table = table_with(&[]);
        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/users")
            .unwrap();
        assert_eq!(found.route.operation_id.as_deref(), Some("listUsers"));
        assert!(found.path_params.is_empty());
    }

    #[test]
    fn test_resolve_with_path_param() {
        let table = table_with(&[]);
        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/users/123")
            .unwrap();
        assert_eq!(found.route.operation_id.as_deref(), Some("getUser"));
        assert_eq!(found.path_params.get("userId").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_literal_routes_win() {
        let table = table_with(&[]);
        assert_eq!(
            operation(&table, Method::GET, "api.example.com", "/v1/users/me").as_deref(),
            Some("getMe")
        );
        assert_eq!(
            operation(&table, Method::GET, "api.example.com", "/v1/users/42/orders").as_deref(),
            Some("getUserOrders")
        );
    }

    #[test]
    fn test_partial_segment_variables() {
        let table = table_with(&[]);
        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/files/report.json")
            .unwrap();
        assert_eq!(found.path_params.get("name").map(String::as_str), Some("report"));
    }

    #[test]
    fn test_trailing_slash_is_a_different_path() {
        let table = table_with(&[]);
        assert!(operation(&table, Method::GET, "api.example.com", "/v1/users/").is_none());
        assert!(operation(&table, Method::GET, "api.example.com", "/v1/users/7/").is_none());
        assert!(operation(&table, Method::GET, "api.example.com", "/v1/users").is_some());
    }

    #[test]
    fn test_path_params_are_percent_decoded() {
        let table = table_with(&[]);
        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/users/ada%20lovelace")
            .unwrap();
        assert_eq!(
            found.path_params.get("userId").map(String::as_str),
            Some("ada lovelace")
        );

        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/files/q%31.json")
            .unwrap();
        assert_eq!(found.path_params.get("name").map(String::as_str), Some("q1"));
    }

    #[test]
    fn test_host_and_base_path_must_match() {
        let table = table_with(&[]);
        assert!(operation(&table, Method::GET, "other.example.com", "/v1/users").is_none());
        assert!(operation(&table, Method::GET, "api.example.com", "/users").is_none());
        assert!(operation(&table, Method::GET, "api.example.com", "/v1users").is_none());
        assert!(operation(&table, Method::GET, "api.example.com:443", "/v1/users").is_some());
        assert!(operation(&table, Method::GET, "api.example.com:8443", "/v1/users").is_none());
        assert!(operation(&table, Method::GET, "API.example.com", "/v1/users").is_some());
    }

    #[test]
    fn test_synthetic_servers() {
        let table = table_with(&["http://localhost:8080", "http://people-api:9000"]);
        assert!(operation(&table, Method::GET, "localhost:8080", "/users").is_some());
        assert!(operation(&table, Method::GET, "people-api:9000", "/users").is_some());
        assert!(operation(&table, Method::GET, "people-api", "/users").is_none());
    }

    #[test]
    fn test_relative_server_matches_any_host() {
        let table = table_with(&["/"]);
        assert!(operation(&table, Method::GET, "whatever.internal", "/users").is_some());
    }

    #[test]
    fn test_not_found_and_method_not_allowed() {
        let table = table_with(&[]);

        let err = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/nonexistent")
            .unwrap_err();
        assert!(matches!(err, SentinelError::RouteNotFound { .. }));

        let err = table
            .find_route(&Method::DELETE, Some("api.example.com"), "/v1/users")
            .unwrap_err();
        match err {
            SentinelError::MethodNotAllowed { allowed, .. } => {
                assert_eq!(allowed, vec!["GET".to_string(), "POST".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_operation_parameters_override_path_item() {
        let table = table_with(&[]);
        let found = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/users/1")
            .unwrap();
        let params = &found.route.parameters;
        assert_eq!(params.len(), 2);

        let verbose = params.iter().find(|p| p.name == "verbose").unwrap();
        assert!(verbose.required);
        assert_eq!(verbose.style, "form");
        assert!(verbose.explode);

        let user = params.iter().find(|p| p.name == "userId").unwrap();
        assert_eq!(user.style, "simple");
        assert!(!user.explode);
    }

    #[test]
    fn test_security_inheritance() {
        let table = table_with(&[]);
        let list = table
            .find_route(&Method::GET, Some("api.example.com"), "/v1/users")
            .unwrap();
        assert_eq!(list.route.security.len(), 1);

        let create = table
            .find_route(&Method::POST, Some("api.example.com"), "/v1/users")
            .unwrap();
        assert!(create.route.security.is_empty());
        assert_eq!(create.route.label(), "POST /users");
    }

    #[test]
    fn test_body_media_type_matching() {
        let table = table_with(&[]);
        let create = table
            .find_route(&Method::POST, Some("api.example.com"), "/v1/users")
            .unwrap();
        let body = create.route.request_body.as_ref().unwrap();

        assert_eq!(
            body.content_for("application/json; charset=utf-8")
                .map(|c| c.media_type.as_str()),
            Some("application/json")
        );
        assert_eq!(
            body.content_for("text/plain").map(|c| c.media_type.as_str()),
            Some("text/*")
        );
        assert!(body.content_for("image/png").is_none());
    }

    #[test]
    fn test_specificity_order() {
        let table = table_with(&[]);
        let templates = table.routes_for_method(&Method::GET);
        assert_eq!(templates[0], "/users/me");
        assert_eq!(templates[1], "/users");
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("Example.com:8080"), ("example.com".to_string(), Some(8080)));
        assert_eq!(split_host("example.com"), ("example.com".to_string(), None));
        assert_eq!(split_host("[::1]:80"), ("[::1]".to_string(), Some(80)));
        assert_eq!(split_host("[::1]"), ("[::1]".to_string(), None));
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/problem+json; charset=utf-8"));
        assert!(!is_json("text/plain"));
    }
}
