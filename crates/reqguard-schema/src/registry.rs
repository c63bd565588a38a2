//! # Shared Schema Registry
//!
//! Route schemas can `$ref` shared definitions (`user.schema.json`,
//! `https://schemas.example.com/user.schema.json`) instead of repeating
//! them on every route. The registry holds those definitions and installs a
//! local retriever so compilation never reaches the network.
//!
//! ## Schema Resolution
//!
//! Every registered schema is indexed under its filename and, when
//! present, its `$id`. A `$ref` URI is resolved by exact match first and
//! then by its last path segment, so `json-schema:///user.schema.json`
//! (a relative reference against a root without `$id`) finds
//! `user.schema.json`. Anything else fails compilation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;

use crate::validate::SchemaError;

/// Local retriever resolving `$ref` URIs against registered schemas.
struct LocalSchemaRetriever {
    schemas_by_uri: Arc<HashMap<String, Value>>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        Err(format!("schema '{uri_str}' is not registered").into())
    }
}

/// A set of shared schemas available to route schemas through `$ref`.
///
/// The registry is immutable once built and cheap to clone; a
/// [`Validator`] compiled from it can be used on any thread.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Map from schema filename (e.g. "user.schema.json") to parsed value.
    schemas: HashMap<String, Value>,
    /// URI/filename index handed to the retriever.
    schemas_by_uri: Arc<HashMap<String, Value>>,
}

impl SchemaRegistry {
    /// Create an empty registry. Route schemas compiled against it may
    /// only use internal references.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.schema.json`, `*.schema.yaml` and `*.schema.yml` file
    /// in `schema_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoad`] if the directory cannot be read
    /// or a file is not valid JSON/YAML.
    pub fn load_dir(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let schema_dir = schema_dir.as_ref();
        let entries = std::fs::read_dir(schema_dir).map_err(|e| SchemaError::SchemaLoad {
            schema_name: schema_dir.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        let mut schemas = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let value = if name.ends_with(".schema.json") {
                let content = std::fs::read_to_string(&path)?;
                serde_json::from_str(&content).map_err(|e| SchemaError::SchemaLoad {
                    schema_name: name.to_string(),
                    reason: format!("invalid JSON: {e}"),
                })?
            } else if name.ends_with(".schema.yaml") || name.ends_with(".schema.yml") {
                let content = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&content).map_err(|e| SchemaError::SchemaLoad {
                    schema_name: name.to_string(),
                    reason: format!("invalid YAML: {e}"),
                })?
            } else {
                continue;
            };
            schemas.insert(name.to_string(), value);
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            schema_count = schemas.len(),
            "loaded shared schemas"
        );

        Ok(Self::from_schemas(schemas))
    }

    /// Build a registry from already-parsed schemas keyed by filename.
    pub fn from_schemas(schemas: HashMap<String, Value>) -> Self {
        let mut schemas_by_uri = HashMap::new();
        for (filename, value) in &schemas {
            if let Some(id) = value.get("$id").and_then(Value::as_str) {
                schemas_by_uri.insert(id.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }
        Self {
            schemas,
            schemas_by_uri: Arc::new(schemas_by_uri),
        }
    }

    /// Returns the number of registered schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Returns the names of all registered schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a registered schema by filename.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        opts.with_retriever(LocalSchemaRetriever {
            schemas_by_uri: Arc::clone(&self.schemas_by_uri),
        });
        opts
    }

    /// Compile `schema` into an executable validator.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValidatorBuild`] if the schema is invalid or
    /// references an unregistered schema.
    pub fn compile(&self, schema: &Value) -> Result<Validator, SchemaError> {
        self.build_options()
            .build(schema)
            .map_err(|e| SchemaError::ValidatorBuild {
                reason: e.to_string(),
            })
    }
}
