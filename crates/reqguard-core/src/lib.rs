//! # reqguard-core — Foundational Types
//!
//! The leaf of the reqguard dependency DAG. Defines the vocabulary every
//! other crate speaks when it talks about "the parts of a request":
//!
//! 1. **[`RequestPart`]**: the closed set of request parts a schema may
//!    name: `params`, `body`, `query`, `headers`, `cookies`, `files`.
//!    Exhaustive `match` everywhere; no bare strings for part names.
//!
//! 2. **[`ValidationTarget`]**: the per-request bundle of live values,
//!    keyed by part, that is handed to the compiled validator.
//!
//! 3. **[`SchemaPath`]**: a parsed nested-key path (`options.schema`,
//!    `options[schema]`) used to locate a schema inside a route's
//!    configuration document.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `reqguard-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bundle;
pub mod error;
pub mod part;
pub mod path;

pub use bundle::ValidationTarget;
pub use error::CoreError;
pub use part::RequestPart;
pub use path::SchemaPath;
