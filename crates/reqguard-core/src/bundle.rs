//! # Validation Target Bundle
//!
//! The ephemeral mapping from request part to live value that is handed to
//! a compiled validator. A bundle only ever holds the parts a schema
//! declares; parts the schema does not mention never reach the validator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::part::RequestPart;

/// Per-request values keyed by request part, in canonical part order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationTarget {
    parts: BTreeMap<RequestPart, Value>,
}

impl ValidationTarget {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the value for a part.
    pub fn insert(&mut self, part: RequestPart, value: Value) -> Option<Value> {
        self.parts.insert(part, value)
    }

    /// Value for a part, if the bundle holds it.
    pub fn get(&self, part: RequestPart) -> Option<&Value> {
        self.parts.get(&part)
    }

    /// Whether the bundle holds a value for `part`.
    pub fn contains(&self, part: RequestPart) -> bool {
        self.parts.contains_key(&part)
    }

    /// Parts held by the bundle, in canonical order.
    pub fn parts(&self) -> impl Iterator<Item = RequestPart> + '_ {
        self.parts.keys().copied()
    }

    /// Iterate `(part, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (RequestPart, &Value)> {
        self.parts.iter().map(|(p, v)| (*p, v))
    }

    /// Number of parts held.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the bundle holds no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Render the bundle as the JSON object a composite schema validates.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .parts
            .iter()
            .map(|(part, value)| (part.as_str().to_string(), value.clone()))
            .collect();
        Value::Object(map)
    }

    /// Rebuild a bundle from a JSON object keyed by part name.
    ///
    /// Keys that are not request parts are ignored; coercion can only
    /// reshape values under keys the bundle already had.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAnObject`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(map) = value else {
            return Err(CoreError::NotAnObject(json_type_name(&value)));
        };
        let parts = map
            .into_iter()
            .filter_map(|(key, v)| RequestPart::from_name(&key).map(|p| (p, v)))
            .collect();
        Ok(Self { parts })
    }
}

impl FromIterator<(RequestPart, Value)> for ValidationTarget {
    fn from_iter<I: IntoIterator<Item = (RequestPart, Value)>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

/// JSON type name used in diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
