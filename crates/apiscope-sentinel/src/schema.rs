//! Schema preparation and compilation.
//!
//! OpenAPI 3.0 schema objects are a dialect of JSON Schema draft 4. The
//! document is prepared once: `nullable: true` becomes a `null` type
//! alternative and local `$ref`s are made absolute against [`DOCUMENT_URI`].
//! Compiled schemas reach the document through a retriever, so `jsonschema`
//! resolves references itself, recursive ones included, and no schema is
//! ever copied into another.

use crate::error::ValidationError;
use jsonschema::{Retrieve, Uri};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Base URI the prepared document is served under to `jsonschema`.
pub const DOCUMENT_URI: &str = "https://apiscope.invalid/openapi.json";

/// Maximum number of `$ref` hops followed when reading a schema's type.
pub const MAX_REF_DEPTH: usize = 32;

/// Resolves a local `#/...` reference against the document root.
pub(crate) fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    root.pointer(local_pointer(reference)?)
}

/// The JSON pointer of a reference into the document.
fn local_pointer(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(DOCUMENT_URI)
        .unwrap_or(reference)
        .strip_prefix('#')
}

/// Hands the prepared document to `jsonschema` and refuses everything else.
struct DocumentRetriever {
    document: Arc<Value>,
}

impl Retrieve for DocumentRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let base = uri.as_str().split('#').next().unwrap_or_default();
        if base == DOCUMENT_URI {
            Ok(Value::clone(&self.document))
        } else {
            Err(format!("reference target '{}' is outside the document", uri.as_str()).into())
        }
    }
}

/// Prepares and compiles schemas against one document.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    document: Arc<Value>,
}

impl SchemaResolver {
    /// Creates a resolver for references into `root`.
    pub fn new(root: &Value) -> Self {
        let mut document = root.clone();
        prepare(&mut document);
        Self {
            document: Arc::new(document),
        }
    }

    /// Prepares and compiles `schema`.
    pub fn compile(&self, schema: &Value) -> Result<CompiledSchema, String> {
        let mut prepared = schema.clone();
        prepare(&mut prepared);

        let mut options = jsonschema::options();
        options.with_draft(jsonschema::Draft::Draft4);
        options.with_retriever(DocumentRetriever {
            document: Arc::clone(&self.document),
        });
        let validator = options.build(&prepared).map_err(|e| e.to_string())?;

        Ok(CompiledSchema {
            schema: prepared,
            document: Arc::clone(&self.document),
            validator,
        })
    }
}

/// Rewrites `nullable` and makes local references absolute, in place.
fn prepare(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if reference.starts_with('#') {
                    reference.insert_str(0, DOCUMENT_URI);
                }
            }
            for child in map.values_mut() {
                prepare(child);
            }
            apply_nullable(map);
        }
        Value::Array(items) => items.iter_mut().for_each(prepare),
        _ => {}
    }
}

fn apply_nullable(schema: &mut Map<String, Value>) {
    if schema.get("nullable") != Some(&Value::Bool(true)) {
        return;
    }

    if let Some(Value::String(ty)) = schema.get("type") {
        let types = Value::Array(vec![Value::String(ty.clone()), Value::from("null")]);
        schema.insert("type".to_string(), types);
    }
    if let Some(Value::Array(values)) = schema.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }
}

/// A schema ready for validation.
pub struct CompiledSchema {
    schema: Value,
    document: Arc<Value>,
    validator: jsonschema::Validator,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// The prepared schema, references left in place.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The declared `type`, ignoring a `null` alternative.
    pub fn primary_type(&self) -> Option<&str> {
        primary_type(self.target(&self.schema))
    }

    /// The declared `type` of array items.
    pub fn item_type(&self) -> Option<&str> {
        self.items_of(&self.schema).and_then(primary_type)
    }

    /// The schema of an object property, references followed.
    pub fn property(&self, name: &str) -> Option<&Value> {
        let property = self.target(&self.schema).get("properties")?.get(name)?;
        Some(self.target(property))
    }

    /// The declared `type` of an object property.
    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(primary_type)
    }

    /// The declared `type` of the items of an array property.
    pub fn property_item_type(&self, name: &str) -> Option<&str> {
        self.property(name)
            .and_then(|property| self.items_of(property))
            .and_then(primary_type)
    }

    fn items_of<'s>(&'s self, schema: &'s Value) -> Option<&'s Value> {
        let items = self.target(schema).get("items")?;
        Some(self.target(items))
    }

    /// Follows `$ref` hops from `schema` to the schema they name.
    fn target<'s>(&'s self, mut schema: &'s Value) -> &'s Value {
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
                break;
            };
            match resolve_pointer(&self.document, reference) {
                Some(next) => schema = next,
                None => break,
            }
        }
        schema
    }

    /// Returns `true` if `instance` satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validates `instance`, prefixing error paths with `location`.
    pub fn validate(&self, instance: &Value, location: &str) -> Vec<ValidationError> {
        self.validator
            .iter_errors(instance)
            .map(|e| {
                let instance_path = e.instance_path.to_string();
                ValidationError {
                    path: format!("{location}{instance_path}"),
                    message: e.to_string(),
                    schema_path: Some(e.schema_path.to_string()),
                    value: Some(e.instance.to_string()),
                }
            })
            .collect()
    }
}

fn primary_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    }
}
