//! # Composite Schemas
//!
//! A [`CompositeSchema`] is the canonical form every schema reference is
//! normalized into before validation: an object schema whose `properties`
//! name request parts. Its declared parts decide which live request values
//! are extracted.

use std::collections::BTreeMap;

use jsonschema::Validator;
use reqguard_core::{RequestPart, SchemaPath, ValidationTarget};
use serde_json::{Map, Value};

use crate::coerce::{coerce, CoercionError, ParseOptions};
use crate::detect::{PartSchema, SchemaRef};
use crate::registry::SchemaRegistry;
use crate::validate::SchemaError;

/// A normalized request schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSchema {
    schema: Value,
    declared: Vec<RequestPart>,
}

impl CompositeSchema {
    /// Accept an already-composite schema value.
    ///
    /// Returns `None` when `schema` has no `properties` object.
    pub fn from_schema(schema: Value) -> Option<Self> {
        let declared = {
            let properties = schema.get("properties")?.as_object()?;
            RequestPart::ALL
                .into_iter()
                .filter(|p| properties.contains_key(p.as_str()))
                .collect()
        };
        Some(Self { schema, declared })
    }

    /// Wrap a per-part mapping into a composite schema.
    ///
    /// Returns `None` for an empty mapping: a composite with no parts is
    /// not a usable schema.
    pub fn from_parts(parts: BTreeMap<RequestPart, PartSchema>) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let declared = parts.keys().copied().collect();
        let properties: Map<String, Value> = parts
            .into_iter()
            .map(|(part, schema)| (part.as_str().to_string(), schema.into_schema()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        Some(Self {
            schema: Value::Object(schema),
            declared,
        })
    }

    /// Normalize a classified schema reference.
    pub fn from_ref(schema_ref: SchemaRef) -> Option<Self> {
        match schema_ref {
            SchemaRef::Composite(schema) => Self::from_schema(schema),
            SchemaRef::PerPart(parts) => Self::from_parts(parts),
        }
    }

    /// The composite schema document.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Sub-schema for one part, if declared.
    pub fn part_schema(&self, part: RequestPart) -> Option<&Value> {
        self.schema.get("properties")?.get(part.as_str())
    }

    /// Declared request parts, in canonical order.
    pub fn declared_parts(&self) -> &[RequestPart] {
        &self.declared
    }

    /// Whether `part` is declared.
    pub fn declares(&self, part: RequestPart) -> bool {
        self.declared.contains(&part)
    }

    /// Compile into an executable validator.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValidatorBuild`] for invalid schemas.
    pub fn compile(&self, registry: &SchemaRegistry) -> Result<Validator, SchemaError> {
        registry.compile(&self.schema)
    }

    /// Coerce a bundle to the declared types.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] when a value cannot be converted.
    pub fn coerce(
        &self,
        target: &ValidationTarget,
        options: &ParseOptions,
    ) -> Result<ValidationTarget, CoercionError> {
        let parsed = coerce(&target.to_value(), &self.schema, options)?;
        ValidationTarget::from_value(parsed).map_err(|e| CoercionError::Shape(e.to_string()))
    }
}

/// Locate and normalize the schema in a route configuration document.
///
/// `path` addresses the schema inside `config`; `None` means the
/// configuration root. Returns `None` when no schema applies and the
/// request should proceed unvalidated.
pub fn resolve(config: &Value, path: Option<&SchemaPath>) -> Option<CompositeSchema> {
    let located = match path {
        Some(path) => path.lookup(config),
        None => config.as_object(),
    }?;
    CompositeSchema::from_ref(SchemaRef::classify(located))
}
