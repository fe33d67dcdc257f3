//! The parsed API descriptor and its per-request derivation.
//!
//! A [`Descriptor`] keeps both the raw bytes it was loaded from and the parsed
//! document tree. The tree is never mutated: [`Descriptor::derive`] clones it
//! before overwriting `host`, `schemes`, `basePath` and `info.version`.

use crate::context::RequestContext;
use crate::error::{DescriptorError, DescriptorResult};
use bytes::Bytes;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Serialization format of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// A JSON document.
    Json,
    /// A YAML document (the default for anything that is not JSON).
    Yaml,
}

impl DescriptorFormat {
    /// `Json` when the bytes are a JSON document, `Yaml` otherwise.
    ///
    /// YAML flow mappings such as `{info: {version: 1}}` are not JSON.
    pub fn detect(bytes: &[u8]) -> Self {
        if serde_json::from_slice::<serde_json::Value>(bytes).is_ok() {
            Self::Json
        } else {
            Self::Yaml
        }
    }

    /// Content type used when serving a document of this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Yaml => "application/x-yaml",
        }
    }
}

/// Runtime-checked accessors for the well-known top-level descriptor keys.
///
/// Unknown structure is reachable through [`get`](DescriptorFields::get).
pub trait DescriptorFields {
    /// The top-level document mapping.
    fn document(&self) -> &Mapping;

    /// Returns the value stored under a top-level key.
    fn get(&self, key: &str) -> Option<&Value> {
        self.document().get(key)
    }

    /// The `info` mapping, if present and a mapping.
    fn info(&self) -> Option<&Mapping> {
        self.get("info").and_then(Value::as_mapping)
    }

    /// `info.version`, if it is a string.
    fn version(&self) -> Option<&str> {
        self.info()
            .and_then(|info| info.get("version"))
            .and_then(Value::as_str)
    }

    /// `host`, if it is a string.
    fn host(&self) -> Option<&str> {
        self.get("host").and_then(Value::as_str)
    }

    /// `schemes`, if it is a sequence of strings.
    fn schemes(&self) -> Option<Vec<&str>> {
        self.get("schemes")
            .and_then(Value::as_sequence)
            .and_then(|seq| seq.iter().map(Value::as_str).collect())
    }

    /// `basePath`, if it is a string.
    fn base_path(&self) -> Option<&str> {
        self.get("basePath").and_then(Value::as_str)
    }
}

/// An API descriptor loaded from YAML or JSON.
///
/// The top level is a mapping with string keys that contains an `info`
/// mapping; construction fails otherwise.
#[derive(Debug, Clone)]
pub struct Descriptor {
    document: Mapping,
    raw: Bytes,
    format: DescriptorFormat,
}

impl Descriptor {
    /// Reads and parses a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> DescriptorResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            DescriptorError::load(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    /// Parses a descriptor from YAML or JSON bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> DescriptorResult<Self> {
        let raw = bytes.into();
        let format = DescriptorFormat::detect(&raw);

        let value: Value =
            serde_yaml::from_slice(&raw).map_err(|e| DescriptorError::load(e.to_string()))?;

        let Value::Mapping(document) = value else {
            return Err(DescriptorError::load("top level is not a mapping"));
        };

        if let Some(key) = document.keys().find(|k| !k.is_string()) {
            return Err(DescriptorError::load(format!(
                "top-level key {key:?} is not a string"
            )));
        }

        match document.get("info") {
            Some(Value::Mapping(_)) => {}
            Some(_) => return Err(DescriptorError::load("'info' is not a mapping")),
            None => return Err(DescriptorError::load("missing 'info' mapping")),
        }

        Ok(Self {
            document,
            raw,
            format,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_format(mut self, format: DescriptorFormat) -> Self {
        self.format = format;
        self
    }

    /// The bytes the descriptor was loaded from.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The format of the source bytes.
    pub fn format(&self) -> DescriptorFormat {
        self.format
    }

    /// Builds the per-request variant of this descriptor.
    ///
    /// Overwrites `host`, `schemes` and `basePath`, and `info.version` when
    /// `info` is a mapping. `serve_path` is stripped from the end of the
    /// request path to form `basePath`.
    pub fn derive(
        &self,
        context: &RequestContext,
        serve_path: &str,
        version: &str,
    ) -> DerivedDescriptor {
        let mut document = self.document.clone();

        document.insert("host".into(), Value::from(context.host.clone()));
        document.insert(
            "schemes".into(),
            Value::Sequence(vec![Value::from(context.scheme)]),
        );
        document.insert(
            "basePath".into(),
            Value::from(context.base_path(serve_path)),
        );

        if let Some(Value::Mapping(info)) = document.get_mut("info") {
            info.insert("version".into(), Value::from(version));
        }

        DerivedDescriptor {
            document,
            format: self.format,
        }
    }
}

impl DescriptorFields for Descriptor {
    fn document(&self) -> &Mapping {
        &self.document
    }
}

/// A descriptor rewritten for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedDescriptor {
    document: Mapping,
    format: DescriptorFormat,
}

impl DerivedDescriptor {
    /// Serializes in the format of the source descriptor.
    pub fn render(&self) -> DescriptorResult<Bytes> {
        render_mapping(&self.document, self.format)
    }

    /// Consumes the derivation, returning the document mapping.
    pub fn into_document(self) -> Mapping {
        self.document
    }
}

impl DescriptorFields for DerivedDescriptor {
    fn document(&self) -> &Mapping {
        &self.document
    }
}

pub(crate) fn render_mapping(
    document: &Mapping,
    format: DescriptorFormat,
) -> DescriptorResult<Bytes> {
    match format {
        DescriptorFormat::Json => Ok(Bytes::from(serde_json::to_vec_pretty(document)?)),
        DescriptorFormat::Yaml => Ok(Bytes::from(serde_yaml::to_string(document)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWAGGER: &str = "\
swagger: \"2.0\"
info:
  title: Content API
  version: 0.0.0
host: localhost
basePath: /
schemes:
  - http
paths:
  /content/{uuid}:
    get:
      responses:
        \"200\":
          description: OK
";

    fn context(url: &str) -> RequestContext {
        RequestContext::from_url(url).unwrap()
    }

    #[test]
    fn test_accessors_on_source() {
        let descriptor = Descriptor::from_bytes(SWAGGER).unwrap();
        assert_eq!(descriptor.version(), Some("0.0.0"));
        assert_eq!(descriptor.host(), Some("localhost"));
        assert_eq!(descriptor.schemes(), Some(vec!["http"]));
        assert_eq!(descriptor.base_path(), Some("/"));
        assert!(descriptor.get("paths").unwrap().is_mapping());
        assert_eq!(descriptor.format(), DescriptorFormat::Yaml);
    }

    #[test]
    fn test_rejects_non_mapping_top_level() {
        let err = Descriptor::from_bytes("- a\n- b\n").unwrap_err();
        assert!(matches!(err, DescriptorError::Load { .. }));
    }

    #[test]
    fn test_rejects_missing_info() {
        let err = Descriptor::from_bytes("swagger: \"2.0\"\n").unwrap_err();
        assert!(err.to_string().contains("info"));
    }

    #[test]
    fn test_rejects_scalar_info() {
        let err = Descriptor::from_bytes("info: hello\n").unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_rejects_non_string_keys() {
        let err = Descriptor::from_bytes("info: {}\n42: answer\n").unwrap_err();
        assert!(err.to_string().contains("not a string"));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(Descriptor::from_bytes("info: [unterminated\n").is_err());
    }

    #[test]
    fn test_detects_json() {
        let descriptor = Descriptor::from_bytes("  {\"info\": {\"version\": \"1\"}}").unwrap();
        assert_eq!(descriptor.format(), DescriptorFormat::Json);
        assert_eq!(descriptor.format().content_type(), "application/json");
    }

    #[test]
    fn test_flow_yaml_is_not_json() {
        let descriptor = Descriptor::from_bytes("{info: {version: \"0.0.0\"}}").unwrap();
        assert_eq!(descriptor.format(), DescriptorFormat::Yaml);
        assert_eq!(descriptor.version(), Some("0.0.0"));

        assert_eq!(
            DescriptorFormat::detect(b"{\"info\": {}} trailing"),
            DescriptorFormat::Yaml
        );
    }

    #[test]
    fn test_derive_overwrites_environment_fields() {
        let descriptor = Descriptor::from_bytes(SWAGGER).unwrap();
        let derived = descriptor.derive(
            &context("https://api.example.com/content/__api"),
            "/__api",
            "2.1.0",
        );

        assert_eq!(derived.host(), Some("api.example.com"));
        assert_eq!(derived.schemes(), Some(vec!["https"]));
        assert_eq!(derived.base_path(), Some("/content"));
        assert_eq!(derived.version(), Some("2.1.0"));
        assert_eq!(derived.get("paths"), descriptor.get("paths"));
    }

    #[test]
    fn test_derive_never_touches_source() {
        let descriptor = Descriptor::from_bytes(SWAGGER).unwrap();
        let before = descriptor.document().clone();

        for _ in 0..3 {
            let _ = descriptor.derive(&context("https://a.example.com/__api"), "/__api", "9.9.9");
        }

        assert_eq!(descriptor.document(), &before);
        assert_eq!(descriptor.version(), Some("0.0.0"));
        assert_eq!(descriptor.host(), Some("localhost"));
    }

    #[test]
    fn test_derive_adds_missing_keys() {
        let descriptor = Descriptor::from_bytes("info:\n  title: Bare\n").unwrap();
        let derived = descriptor.derive(&context("https://h.example.com/x"), "/__api", "1.0.0");

        assert_eq!(derived.host(), Some("h.example.com"));
        assert_eq!(derived.base_path(), Some("/"));
        assert_eq!(derived.version(), Some("1.0.0"));
    }

    #[test]
    fn test_render_keeps_json_format() {
        let descriptor =
            Descriptor::from_bytes("{\"info\": {\"title\": \"t\", \"version\": \"0\"}}").unwrap();
        let derived = descriptor.derive(&context("https://h.example.com/__api"), "/__api", "3.0.0");
        let rendered = derived.render().unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&rendered).unwrap();
        assert_eq!(parsed["info"]["version"], "3.0.0");
        assert_eq!(parsed["schemes"], serde_json::json!(["https"]));
    }

    #[test]
    fn test_render_json_with_sequence_key_fails() {
        let mut document = Mapping::new();
        document.insert(
            Value::Sequence(vec![Value::from("a")]),
            Value::from("complex key"),
        );

        let result = render_mapping(&document, DescriptorFormat::Json);
        assert!(matches!(result, Err(DescriptorError::Serialize { .. })));
    }
}
