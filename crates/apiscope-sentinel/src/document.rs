//! OpenAPI 3 document model, loading and structural validation.
//!
//! The model is partial: it types what routing and request
//! validation need (servers, paths, operations, parameters, request bodies,
//! security) and keeps schemas and responses as raw JSON values. The full
//! parsed tree is kept alongside so `$ref` pointers can be resolved against it.

use crate::error::{SentinelError, SentinelResult};
use crate::schema::{self, SchemaResolver};
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::debug;

/// Either an inline object or a `$ref` to one under `#/components`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// A reference such as `#/components/parameters/Limit`.
    Ref {
        /// The JSON pointer fragment.
        #[serde(rename = "$ref")]
        reference: String,
    },
    /// An inline object.
    Item(T),
}

/// OpenAPI document root object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version (should be `3.x`). YAML may parse it as a number.
    #[serde(default)]
    pub openapi: Option<Value>,
    /// API metadata.
    #[serde(default)]
    pub info: Option<Info>,
    /// Servers the API is reachable at.
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Paths and their operations.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components.
    #[serde(default)]
    pub components: Option<Components>,
    /// Document-wide security requirements.
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
}

/// API metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: Option<String>,
    /// API version.
    #[serde(default)]
    pub version: Option<Value>,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server URL, possibly templated with `{variables}`.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server variables for URL templating.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
}

impl Server {
    /// Creates a server entry for a plain URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
            variables: IndexMap::new(),
        }
    }

    /// The URL with every `{variable}` replaced by its default.
    pub fn resolved_url(&self) -> String {
        self.variables
            .iter()
            .fold(self.url.clone(), |url, (name, variable)| {
                url.replace(&format!("{{{name}}}"), &variable.default)
            })
    }
}

/// Server variable for URL templating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVariable {
    /// Default value.
    pub default: String,
    /// Possible values.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// A path item containing operations for a single path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    /// Parameters common to all operations on this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    /// Iterates the declared operations with their methods.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        [
            (Method::GET, &self.get),
            (Method::PUT, &self.put),
            (Method::POST, &self.post),
            (Method::DELETE, &self.delete),
            (Method::OPTIONS, &self.options),
            (Method::HEAD, &self.head),
            (Method::PATCH, &self.patch),
            (Method::TRACE, &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

/// An API operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    #[serde(default, rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Whether deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// Parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
    /// Request body.
    #[serde(default, rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RefOr<RequestBody>>,
    /// Responses by status code.
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
    /// Security requirements, overriding the document-wide ones when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
    /// HTTP header.
    Header,
    /// Cookie.
    Cookie,
}

impl ParameterIn {
    /// Parses the `in` field of a parameter.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// The lowercase name used in documents and error paths.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

/// An operation parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parameter location, as written in the document.
    #[serde(default, rename = "in")]
    pub location: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Serialization style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Whether arrays and objects are exploded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    /// Parameter schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Schema by media type, the alternative to `schema`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

impl Parameter {
    /// The parsed location, if valid.
    pub fn parsed_location(&self) -> Option<ParameterIn> {
        self.location.as_deref().and_then(ParameterIn::parse)
    }
}

/// Request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Reusable schemas.
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,
    /// Reusable parameters.
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    /// Reusable request bodies.
    #[serde(default, rename = "requestBodies")]
    pub request_bodies: IndexMap<String, RequestBody>,
    /// Reusable responses.
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
    /// Security schemes.
    #[serde(default, rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, Value>,
}

/// Security requirement: scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// A parsed OpenAPI document together with its raw JSON tree.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    openapi: OpenApiDocument,
    raw: Value,
}

impl ApiDocument {
    /// Reads and parses a YAML or JSON document file.
    pub fn from_file(path: impl AsRef<Path>) -> SentinelResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| SentinelError::Load {
            reason: format!("cannot read '{}': {e}", path.display()),
        })?;
        Self::from_slice(&bytes)
    }

    /// Parses a YAML or JSON document.
    pub fn from_slice(bytes: &[u8]) -> SentinelResult<Self> {
        let raw: Value = serde_yaml::from_slice(bytes).map_err(|e| SentinelError::Load {
            reason: e.to_string(),
        })?;
        if !raw.is_object() {
            return Err(SentinelError::Load {
                reason: "top level is not a mapping".to_string(),
            });
        }

        let openapi: OpenApiDocument =
            serde_json::from_value(raw.clone()).map_err(|e| SentinelError::Load {
                reason: e.to_string(),
            })?;

        debug!(
            paths = openapi.paths.len(),
            servers = openapi.servers.len(),
            "API document loaded"
        );

        Ok(Self { openapi, raw })
    }

    /// The typed document.
    pub fn openapi(&self) -> &OpenApiDocument {
        &self.openapi
    }

    /// The raw parsed tree, used to resolve `$ref` pointers.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Appends a server to the document's server list.
    pub fn add_server(&mut self, server: Server) {
        self.openapi.servers.push(server);
    }

    /// Resolves a parameter reference.
    pub fn parameter<'a>(&'a self, item: &'a RefOr<Parameter>) -> Option<&'a Parameter> {
        match item {
            RefOr::Item(param) => Some(param),
            RefOr::Ref { reference } => reference
                .strip_prefix("#/components/parameters/")
                .and_then(|name| self.openapi.components.as_ref()?.parameters.get(name)),
        }
    }

    /// Resolves a request body reference.
    pub fn request_body<'a>(&'a self, item: &'a RefOr<RequestBody>) -> Option<&'a RequestBody> {
        match item {
            RefOr::Item(body) => Some(body),
            RefOr::Ref { reference } => reference
                .strip_prefix("#/components/requestBodies/")
                .and_then(|name| self.openapi.components.as_ref()?.request_bodies.get(name)),
        }
    }

    /// Structurally and semantically validates the document.
    ///
    /// Every problem found is reported in a single
    /// [`SentinelError::SchemaInvalid`].
    pub fn validate(&self) -> SentinelResult<()> {
        let mut problems = Vec::new();

        self.validate_header(&mut problems);
        self.validate_servers(&mut problems);
        self.validate_paths(&mut problems);
        self.validate_refs(&mut problems);
        self.validate_schemas(&mut problems);

        if problems.is_empty() {
            debug!("API document is valid");
            Ok(())
        } else {
            Err(SentinelError::SchemaInvalid { problems })
        }
    }

    fn validate_header(&self, problems: &mut Vec<String>) {
        let version = match &self.openapi.openapi {
            Some(Value::String(v)) => Some(v.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        match version.as_deref() {
            None => problems.push("missing 'openapi' version".to_string()),
            Some(v) if !v.starts_with("3.") => {
                problems.push(format!("unsupported openapi version '{v}', expected 3.x"));
            }
            Some(_) => {}
        }

        match &self.openapi.info {
            None => problems.push("missing 'info'".to_string()),
            Some(info) => {
                if info.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    problems.push("'info.title' must be a non-empty string".to_string());
                }
                let has_version = match &info.version {
                    Some(Value::String(v)) => !v.trim().is_empty(),
                    Some(Value::Number(_)) => true,
                    _ => false,
                };
                if !has_version {
                    problems.push("'info.version' must be present".to_string());
                }
            }
        }
    }

    fn validate_servers(&self, problems: &mut Vec<String>) {
        for server in &self.openapi.servers {
            let resolved = server.resolved_url();
            if resolved.contains('{') {
                problems.push(format!(
                    "server '{}' uses an undeclared variable",
                    server.url
                ));
                continue;
            }
            if !resolved.starts_with('/') && url::Url::parse(&resolved).is_err() {
                problems.push(format!("server url '{}' is not a valid URL", server.url));
            }
        }
    }

    fn validate_paths(&self, problems: &mut Vec<String>) {
        let mut operation_ids = HashSet::new();

        for (path, item) in &self.openapi.paths {
            if !path.starts_with('/') {
                problems.push(format!("path '{path}' must start with '/'"));
            }
            let variables = match template_variables(path) {
                Ok(vars) => vars,
                Err(reason) => {
                    problems.push(format!("path '{path}': {reason}"));
                    continue;
                }
            };

            let shared = self.validate_parameters(path, "path item", &item.parameters, problems);

            for (method, operation) in item.operations() {
                let label = format!("{method} {path}");

                if operation.responses.is_empty() {
                    problems.push(format!("{label}: at least one response is required"));
                }

                if let Some(id) = &operation.operation_id {
                    if !operation_ids.insert(id.clone()) {
                        problems.push(format!("{label}: duplicate operationId '{id}'"));
                    }
                }

                let own = self.validate_parameters(path, &label, &operation.parameters, problems);

                let declared: BTreeSet<&str> = shared
                    .iter()
                    .chain(own.iter())
                    .map(String::as_str)
                    .collect();
                for var in &variables {
                    if !declared.contains(var.as_str()) {
                        problems.push(format!(
                            "{label}: path variable '{var}' has no matching path parameter"
                        ));
                    }
                }
            }
        }
    }

    /// Checks a parameter list, returning the names of its path parameters.
    fn validate_parameters(
        &self,
        path: &str,
        label: &str,
        parameters: &[RefOr<Parameter>],
        problems: &mut Vec<String>,
    ) -> Vec<String> {
        let mut path_params = Vec::new();

        for item in parameters {
            let Some(param) = self.parameter(item) else {
                // Dangling references are reported by `validate_refs`.
                continue;
            };
            let name = match param.name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => {
                    problems.push(format!("{label}: parameter without a name"));
                    continue;
                }
            };
            match param.parsed_location() {
                None => problems.push(format!(
                    "{label}: parameter '{name}' has invalid location {:?}",
                    param.location
                )),
                Some(ParameterIn::Path) => {
                    if !param.required {
                        problems.push(format!(
                            "{label}: path parameter '{name}' must be required"
                        ));
                    }
                    if !path.contains(&format!("{{{name}}}")) {
                        problems.push(format!(
                            "{label}: path parameter '{name}' does not appear in '{path}'"
                        ));
                    }
                    path_params.push(name.to_string());
                }
                Some(_) => {}
            }
            if param.schema.is_some() && !param.content.is_empty() {
                problems.push(format!(
                    "{label}: parameter '{name}' declares both 'schema' and 'content'"
                ));
            }
        }

        path_params
    }

    fn validate_refs(&self, problems: &mut Vec<String>) {
        let mut refs = Vec::new();
        collect_refs(&self.raw, &mut refs);

        for reference in refs {
            if !reference.starts_with("#/components/") {
                problems.push(format!(
                    "reference '{reference}' must point into '#/components'"
                ));
            } else if schema::resolve_pointer(&self.raw, &reference).is_none() {
                problems.push(format!("reference '{reference}' does not resolve"));
            }
        }
    }

    fn validate_schemas(&self, problems: &mut Vec<String>) {
        let resolver = SchemaResolver::new(&self.raw);

        if let Some(components) = &self.openapi.components {
            for (name, schema) in &components.schemas {
                if let Err(reason) = resolver.compile(schema) {
                    problems.push(format!("schema '{name}' does not compile: {reason}"));
                }
            }
        }

        for (path, item) in &self.openapi.paths {
            for (method, operation) in item.operations() {
                let Some(body) = operation.request_body.as_ref().and_then(|b| self.request_body(b))
                else {
                    continue;
                };
                for (media, content) in &body.content {
                    if let Some(schema) = &content.schema {
                        if let Err(reason) = resolver.compile(schema) {
                            problems.push(format!(
                                "{method} {path}: request body schema for '{media}' does not compile: {reason}"
                            ));
                        }
                    }
                }
            }
        }
    }
}

/// Extracts `{variable}` names from a path template.
pub(crate) fn template_variables(path: &str) -> Result<Vec<String>, String> {
    let mut variables = Vec::new();
    let mut current: Option<String> = None;

    for ch in path.chars() {
        match (ch, current.as_mut()) {
            ('{', None) => current = Some(String::new()),
            ('{', Some(_)) => return Err("nested '{' in template".to_string()),
            ('}', None) => return Err("unbalanced '}' in template".to_string()),
            ('}', Some(name)) => {
                if name.is_empty() {
                    return Err("empty template variable".to_string());
                }
                variables.push(std::mem::take(name));
                current = None;
            }
            ('/', Some(_)) => return Err("template variable spans a '/'".to_string()),
            (c, Some(name)) => name.push(c),
            (_, None) => {}
        }
    }

    if current.is_some() {
        return Err("unbalanced '{' in template".to_string());
    }
    Ok(variables)
}

fn collect_refs(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => refs.push(reference.clone()),
                    _ => collect_refs(child, refs),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}
