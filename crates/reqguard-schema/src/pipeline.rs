//! # Evaluate Pipeline
//!
//! One validation pass over a request bundle:
//!
//! ```text
//! compile → (coerce?) → validate → Valid { raw, parsed } | Invalid(violations)
//! ```
//!
//! The schema is compiled on every call; nothing is cached between
//! requests. A coercion failure is not a validation failure: it is logged
//! and the raw bundle is validated instead.

use reqguard_core::ValidationTarget;

use crate::coerce::ParseOptions;
use crate::composite::CompositeSchema;
use crate::registry::SchemaRegistry;
use crate::validate::{collect_violations, SchemaError, ValidationViolations};

/// Result of validating one bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The bundle satisfied the schema.
    Valid {
        /// Values as extracted from the request.
        raw: ValidationTarget,
        /// Coerced values, when parsing was enabled and succeeded.
        parsed: Option<ValidationTarget>,
    },
    /// The bundle violated the schema.
    Invalid(ValidationViolations),
}

impl Outcome {
    /// Whether the bundle satisfied the schema.
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid { .. })
    }

    /// The values downstream code should see: parsed when available,
    /// raw otherwise. `None` for invalid outcomes.
    pub fn values(&self) -> Option<&ValidationTarget> {
        match self {
            Outcome::Valid { raw, parsed } => Some(parsed.as_ref().unwrap_or(raw)),
            Outcome::Invalid(_) => None,
        }
    }
}

/// Validate `target` against `schema`, coercing first when `parse` is set.
///
/// # Errors
///
/// Returns [`SchemaError::ValidatorBuild`] when the schema does not
/// compile. Validation failures are reported through [`Outcome::Invalid`].
pub fn evaluate(
    schema: &CompositeSchema,
    registry: &SchemaRegistry,
    target: ValidationTarget,
    parse: Option<&ParseOptions>,
) -> Result<Outcome, SchemaError> {
    let validator = schema.compile(registry)?;

    let parsed = parse.and_then(|options| match schema.coerce(&target, options) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::warn!(%error, "parsing failed; validating unparsed values");
            None
        }
    });

    let instance = parsed.as_ref().unwrap_or(&target).to_value();
    let violations = collect_violations(&validator, &instance);

    if violations.is_empty() {
        tracing::debug!(parsed = parsed.is_some(), "request values are valid");
        Ok(Outcome::Valid {
            raw: target,
            parsed,
        })
    } else {
        tracing::debug!(violations = violations.len(), "request values are invalid");
        Ok(Outcome::Invalid(violations))
    }
}
