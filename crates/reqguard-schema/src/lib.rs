//! # reqguard-schema — Schema Normalization, Validation & Coercion
//!
//! Turns whatever a route's configuration says about its schema into a
//! [`CompositeSchema`], compiles it with the `jsonschema` crate, and runs
//! it against a request bundle.
//!
//! ## Modules
//!
//! - [`detect`]: the schema-vs-field-map discriminant and the
//!   [`SchemaRef`] tagged union.
//! - [`composite`]: normalization into [`CompositeSchema`] and
//!   [`resolve`], the route-configuration lookup.
//! - [`registry`]: shared schemas for cross-schema `$ref`, resolved
//!   locally without network access.
//! - [`validate`]: violation collection.
//! - [`coerce`]: type-directed parsing of request values.
//! - [`pipeline`]: [`evaluate`], one compile → coerce → validate pass.
//!
//! ## Crate Policy
//!
//! - Depends only on `reqguard-core` internally.
//! - Knows nothing about HTTP; callers supply bundles.

pub mod coerce;
pub mod composite;
pub mod detect;
pub mod pipeline;
pub mod registry;
pub mod validate;

pub use coerce::{CoercionError, ParseOptions};
pub use composite::{resolve, CompositeSchema};
pub use detect::{is_schema, wrap_fields, PartSchema, SchemaRef};
pub use pipeline::{evaluate, Outcome};
pub use registry::SchemaRegistry;
pub use validate::{SchemaError, ValidationViolations, Violation};
