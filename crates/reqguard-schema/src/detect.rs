//! # Shape Detection
//!
//! Route configuration may hold a schema in two shapes:
//!
//! - a **composite schema**, a JSON Schema whose `properties` are request
//!   parts;
//! - a **per-part mapping**, a plain object from part name to either a
//!   schema or a plain field map (`{"name": {"type": "string"}}`).
//!
//! Shape is decided by [`is_schema`], an explicit discriminant over the
//! structural JSON Schema keywords. Field maps are wrapped into object
//! schemas by [`wrap_fields`].

use std::collections::BTreeMap;

use reqguard_core::RequestPart;
use serde_json::{Map, Value};

/// Whether `value` is a JSON Schema rather than a plain field map.
///
/// Booleans are schemas. Objects are schemas when they carry at least one
/// structural keyword with a correctly-typed value; `{"type": {...}}` is a
/// field map with a field named `type`, not a schema.
pub fn is_schema(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Object(map) => map.iter().any(|(k, v)| is_structural_keyword(k, v)),
        _ => false,
    }
}

fn is_structural_keyword(key: &str, value: &Value) -> bool {
    match key {
        "$schema" | "$ref" | "$id" | "$anchor" | "$dynamicRef" => value.is_string(),
        "type" => match value {
            Value::String(_) => true,
            Value::Array(types) => !types.is_empty() && types.iter().all(Value::is_string),
            _ => false,
        },
        "allOf" | "anyOf" | "oneOf" | "enum" | "prefixItems" => value.is_array(),
        _ => false,
    }
}

/// Schema for one request part inside a per-part mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PartSchema {
    /// Already a schema; used as is.
    Schema(Value),
    /// A plain field map, wrapped into an object schema on use.
    Fields(Map<String, Value>),
}

impl PartSchema {
    /// Classify a per-part value. Returns `None` for values that are
    /// neither a schema nor an object.
    pub fn classify(value: &Value) -> Option<Self> {
        if is_schema(value) {
            Some(Self::Schema(value.clone()))
        } else {
            value.as_object().cloned().map(Self::Fields)
        }
    }

    /// Turn the part into a schema, wrapping field maps.
    pub fn into_schema(self) -> Value {
        match self {
            Self::Schema(schema) => schema,
            Self::Fields(fields) => wrap_fields(fields),
        }
    }
}

/// A schema reference read from route configuration, before
/// normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    /// A composite schema naming request parts in its `properties`.
    Composite(Value),
    /// A per-part mapping. Empty when nothing in the configuration named a
    /// recognized part.
    PerPart(BTreeMap<RequestPart, PartSchema>),
}

impl SchemaRef {
    /// Classify the object found at the schema location.
    pub fn classify(config: &Map<String, Value>) -> Self {
        let is_composite = config.get("properties").is_some_and(Value::is_object)
            && config.iter().any(|(k, v)| is_structural_keyword(k, v));
        if is_composite {
            return Self::Composite(Value::Object(config.clone()));
        }

        let mut parts = BTreeMap::new();
        for part in RequestPart::ALL {
            let Some(value) = config.get(part.as_str()) else {
                continue;
            };
            match PartSchema::classify(value) {
                Some(schema) => {
                    parts.insert(part, schema);
                }
                None => {
                    tracing::warn!(
                        part = %part,
                        "ignoring part schema that is neither a schema nor a field map"
                    );
                }
            }
        }
        Self::PerPart(parts)
    }
}

/// Wrap a plain field map into an object schema.
///
/// Field values that are schemas become `properties`; a boolean
/// `required` on a field schema is hoisted into the wrapper's `required`
/// list. Nested plain maps are wrapped recursively. Other values are
/// dropped.
pub fn wrap_fields(fields: Map<String, Value>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, value) in fields {
        let field_schema = if is_schema(&value) {
            value
        } else if let Value::Object(nested) = value {
            wrap_fields(nested)
        } else {
            tracing::warn!(field = %name, "ignoring field that is neither a schema nor a field map");
            continue;
        };

        let (field_schema, is_required) = take_required_flag(field_schema);
        if is_required {
            required.push(Value::String(name.clone()));
        }
        properties.insert(name, field_schema);
    }

    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    Value::Object(schema)
}

/// Strip a boolean `required` from a field schema, reporting its value.
/// Array-valued `required` is a real keyword and stays.
fn take_required_flag(schema: Value) -> (Value, bool) {
    match schema {
        Value::Object(mut map) => match map.get("required") {
            Some(Value::Bool(flag)) => {
                let flag = *flag;
                map.remove("required");
                (Value::Object(map), flag)
            }
            _ => (Value::Object(map), false),
        },
        other => (other, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_discriminant() {
        assert!(is_schema(&json!(true)));
        assert!(is_schema(&json!({"type": "string"})));
        assert!(is_schema(&json!({"type": ["string", "null"]})));
        assert!(is_schema(&json!({"$ref": "user.schema.json"})));
        assert!(is_schema(&json!({"anyOf": [{"type": "string"}]})));
        assert!(is_schema(&json!({"enum": ["a", "b"]})));

        assert!(!is_schema(&json!({})));
        assert!(!is_schema(&json!({"name": {"type": "string"}})));
        assert!(!is_schema(&json!({"type": {"type": "string"}})));
        assert!(!is_schema(&json!({"type": []})));
        assert!(!is_schema(&json!("string")));
        assert!(!is_schema(&json!(null)));
    }

    #[test]
    fn wrap_fields_builds_object_schema() {
        let fields = json!({"name": {"type": "string"}, "age": {"type": "integer"}});
        let wrapped = wrap_fields(fields.as_object().unwrap().clone());
        assert_eq!(
            wrapped,
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}, "age": {"type": "integer"}}
            })
        );
    }

    #[test]
    fn wrap_fields_hoists_boolean_required() {
        let fields = json!({
            "name": {"type": "string", "required": true},
            "nick": {"type": "string", "required": false}
        });
        let wrapped = wrap_fields(fields.as_object().unwrap().clone());
        assert_eq!(wrapped["required"], json!(["name"]));
        assert!(wrapped["properties"]["name"].get("required").is_none());
        assert!(wrapped["properties"]["nick"].get("required").is_none());
    }

    #[test]
    fn wrap_fields_recurses_into_nested_maps() {
        let fields = json!({"address": {"city": {"type": "string", "required": true}}});
        let wrapped = wrap_fields(fields.as_object().unwrap().clone());
        assert_eq!(
            wrapped["properties"]["address"],
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })
        );
    }

    #[test]
    fn wrap_fields_drops_scalars() {
        let wrapped = wrap_fields(json!({"name": "string"}).as_object().unwrap().clone());
        assert_eq!(wrapped["properties"], json!({}));
    }

    #[test]
    fn classify_composite() {
        let config = json!({"type": "object", "properties": {"body": {"type": "object"}}});
        assert!(matches!(
            SchemaRef::classify(config.as_object().unwrap()),
            SchemaRef::Composite(_)
        ));
    }

    #[test]
    fn classify_per_part_mapping() {
        let config = json!({
            "body": {"name": {"type": "string"}},
            "query": {"type": "object"},
            "headers": 5,
            "error_handler": "nope"
        });
        let SchemaRef::PerPart(parts) = SchemaRef::classify(config.as_object().unwrap()) else {
            panic!("expected per-part mapping");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[&RequestPart::Body], PartSchema::Fields(_)));
        assert!(matches!(parts[&RequestPart::Query], PartSchema::Schema(_)));
    }

    #[test]
    fn properties_without_keyword_is_not_composite() {
        // A field map that happens to contain a field called "properties".
        let config = json!({"properties": {"body": {}}});
        assert_eq!(
            SchemaRef::classify(config.as_object().unwrap()),
            SchemaRef::PerPart(BTreeMap::new())
        );
    }
}
