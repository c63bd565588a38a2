//! # Type Coercion
//!
//! "Parsing" converts request values, which arrive mostly as strings, to
//! the types a schema declares: `"42"` becomes `42` for an `integer`
//! field, `"true"` becomes `true` for a `boolean`, a lone query value
//! becomes a one-element array for an `array` field.
//!
//! Coercion is type-directed and never validates: it only reshapes values
//! the schema can describe and reports an error when a value cannot be
//! converted to any declared type. The caller decides what a failure
//! means (the middleware falls back to the raw values).
//!
//! ## Rules
//!
//! | Target    | Accepted conversions                                  |
//! |-----------|-------------------------------------------------------|
//! | `integer` | integral strings, integral floats                     |
//! | `number`  | numeric strings (integral strings stay integers)      |
//! | `boolean` | `"true"`, `"false"`, `"1"`, `"0"`, `1`, `0`           |
//! | `string`  | numbers, booleans                                     |
//! | `null`    | `""`, `"null"`                                        |
//! | `array`   | any scalar, wrapped                                   |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use reqguard_core::bundle::json_type_name;

/// Recursion limit for nested schemas and `$ref` chains.
const MAX_DEPTH: usize = 64;

/// Options controlling coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Drop object keys the schema does not declare.
    pub strip_unknown: bool,
    /// Fill missing object properties from their `default`.
    pub apply_defaults: bool,
}

/// Error while coercing a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// No declared type accepts the value.
    #[error("cannot coerce {found} at '{path}' to {expected}")]
    Incompatible {
        /// JSON Pointer to the value.
        path: String,
        /// Declared type(s), `|`-separated.
        expected: String,
        /// JSON type of the value.
        found: &'static str,
    },

    /// A local `$ref` does not point anywhere in the schema.
    #[error("unresolved reference '{0}'")]
    UnresolvedRef(String),

    /// Schema nesting exceeded the recursion limit.
    #[error("schema nesting too deep at '{0}'")]
    DepthExceeded(String),

    /// The coerced bundle no longer has the shape of a bundle.
    #[error("coerced value has the wrong shape: {0}")]
    Shape(String),
}

/// Coerce `value` to the types declared by `schema`.
///
/// # Errors
///
/// See [`CoercionError`].
pub fn coerce(value: &Value, schema: &Value, options: &ParseOptions) -> Result<Value, CoercionError> {
    Coercer {
        root: schema,
        options,
    }
    .coerce(value, schema, "", 0)
}

struct Coercer<'a> {
    root: &'a Value,
    options: &'a ParseOptions,
}

impl Coercer<'_> {
    fn coerce(
        &self,
        value: &Value,
        schema: &Value,
        path: &str,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        if depth > MAX_DEPTH {
            return Err(CoercionError::DepthExceeded(path.to_string()));
        }
        let Value::Object(schema) = schema else {
            return Ok(value.clone());
        };

        let mut current = value.clone();

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if let Some(target) = self.resolve_local_ref(reference)? {
                current = self.coerce(&current, target, path, depth + 1)?;
            }
        }

        if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
            for branch in branches {
                current = self.coerce(&current, branch, path, depth + 1)?;
            }
        }

        for keyword in ["anyOf", "oneOf"] {
            if let Some(branches) = schema.get(keyword).and_then(Value::as_array) {
                if let Some(coerced) = branches
                    .iter()
                    .find_map(|b| self.coerce(&current, b, path, depth + 1).ok())
                {
                    current = coerced;
                }
            }
        }

        match declared_types(schema) {
            Some(types) => self.coerce_to_types(current, &types, schema, path, depth),
            None => self.coerce_structure(current, schema, path, depth),
        }
    }

    /// Resolve `#/...` references against the root schema. External
    /// references are left to the validator.
    fn resolve_local_ref(&self, reference: &str) -> Result<Option<&Value>, CoercionError> {
        let Some(pointer) = reference.strip_prefix('#') else {
            return Ok(None);
        };
        self.root
            .pointer(pointer)
            .map(Some)
            .ok_or_else(|| CoercionError::UnresolvedRef(reference.to_string()))
    }

    fn coerce_to_types(
        &self,
        value: Value,
        types: &[&str],
        schema: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        if types.iter().any(|t| matches_type(&value, t)) {
            return self.coerce_structure(value, schema, path, depth);
        }

        for ty in types {
            if let Some(converted) = convert_scalar(&value, ty) {
                return self.coerce_structure(converted, schema, path, depth);
            }
        }

        Err(CoercionError::Incompatible {
            path: path.to_string(),
            expected: types.join("|"),
            found: json_type_name(&value),
        })
    }

    fn coerce_structure(
        &self,
        value: Value,
        schema: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        match value {
            Value::Object(map) => self.coerce_object(map, schema, path, depth),
            Value::Array(items) => self.coerce_array(items, schema, path, depth),
            other => Ok(other),
        }
    }

    fn coerce_object(
        &self,
        map: Map<String, Value>,
        schema: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        let properties = schema.get("properties").and_then(Value::as_object);
        let additional = schema.get("additionalProperties");
        let admits_extra = schema.contains_key("patternProperties")
            || matches!(additional, Some(Value::Bool(true)) | Some(Value::Object(_)));

        let mut out = Map::new();
        for (key, value) in map {
            let child = format!("{path}/{}", escape_pointer(&key));
            if let Some(property) = properties.and_then(|p| p.get(&key)) {
                let coerced = self.coerce(&value, property, &child, depth + 1)?;
                out.insert(key, coerced);
            } else if let Some(extra @ Value::Object(_)) = additional {
                let coerced = self.coerce(&value, extra, &child, depth + 1)?;
                out.insert(key, coerced);
            } else if self.options.strip_unknown && !admits_extra {
                tracing::trace!(path = %child, "stripping undeclared key");
            } else {
                out.insert(key, value);
            }
        }

        if self.options.apply_defaults {
            for (key, property) in properties.into_iter().flatten() {
                if out.contains_key(key) {
                    continue;
                }
                if let Some(default) = property.get("default") {
                    out.insert(key.clone(), default.clone());
                }
            }
        }

        Ok(Value::Object(out))
    }

    fn coerce_array(
        &self,
        items: Vec<Value>,
        schema: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        let prefix = schema
            .get("prefixItems")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let rest = schema.get("items");

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let child = format!("{path}/{i}");
            let item_schema = prefix.get(i).or(rest);
            match item_schema {
                Some(item_schema) => out.push(self.coerce(&item, item_schema, &child, depth + 1)?),
                None => out.push(item),
            }
        }
        Ok(Value::Array(out))
    }
}

/// Types named by the schema's `type` keyword, if any.
fn declared_types(schema: &Map<String, Value>) -> Option<Vec<&str>> {
    match schema.get("type")? {
        Value::String(ty) => Some(vec![ty.as_str()]),
        Value::Array(types) => Some(types.iter().filter_map(Value::as_str).collect()),
        _ => None,
    }
}

fn matches_type(value: &Value, ty: &str) -> bool {
    match ty {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

fn convert_scalar(value: &Value, ty: &str) -> Option<Value> {
    match (ty, value) {
        ("integer", Value::String(s)) => parse_integer(s.trim()),
        ("integer", Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64))),
        ("number", Value::String(s)) => parse_number(s.trim()),
        ("boolean", Value::String(s)) => match s.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ("boolean", Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("null", Value::String(s)) if s.is_empty() || s == "null" => Some(Value::Null),
        ("array", v) if !v.is_array() && !v.is_object() => Some(Value::Array(vec![v.clone()])),
        _ => None,
    }
}

fn parse_integer(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Value::Number(u.into()));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    convert_scalar(&Value::Number(Number::from_f64(f)?), "integer")
}

fn parse_number(s: &str) -> Option<Value> {
    if let Some(integer) = s.parse::<i64>().ok().map(|i| Value::Number(i.into())) {
        return Some(integer);
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
