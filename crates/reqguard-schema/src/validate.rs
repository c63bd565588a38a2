//! # Schema Validation
//!
//! Runs a compiled JSON Schema (Draft 2020-12) against a validation target
//! bundle and collects every violation, in the order the validator reports
//! them.
//!
//! Validation is a trust boundary. Each violation carries the instance
//! path (a JSON Pointer rooted at the bundle, so `/body/name`), the schema
//! path that triggered it, a human-readable message, and the request part
//! it belongs to.

use std::fmt;

use jsonschema::Validator;
use reqguard_core::RequestPart;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Error while loading or compiling schemas.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The compiled validator could not be built (invalid schema, or an
    /// unresolvable `$ref`).
    #[error("validator build error: {reason}")]
    ValidatorBuild {
        /// Reason the validator could not be built.
        reason: String,
    },

    /// A shared schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoad {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// IO error reading a schema directory or file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the violating value, rooted at the bundle.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
    /// JSON Pointer within the schema that triggered the violation.
    pub schema_path: String,
    /// Request part the violating value belongs to. Absent for violations
    /// against the bundle itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<RequestPart>,
}

impl Violation {
    /// Build a violation, deriving the request part from the first
    /// segment of `path`.
    pub fn new(path: String, schema_path: String, message: String) -> Self {
        let part = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .and_then(RequestPart::from_name);
        Self {
            path,
            message,
            schema_path,
            part,
        }
    }

    /// The schema keyword that failed (last segment of the schema path).
    pub fn keyword(&self) -> &str {
        self.schema_path.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.path, self.message)
        }
    }
}

/// Ordered collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl From<Vec<Violation>> for ValidationViolations {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Run `validator` against `instance`, collecting every violation.
pub fn collect_violations(validator: &Validator, instance: &Value) -> ValidationViolations {
    validator
        .iter_errors(instance)
        .map(|e| {
            Violation::new(
                e.instance_path.to_string(),
                e.schema_path.to_string(),
                e.to_string(),
            )
        })
        .collect::<Vec<_>>()
        .into()
}
