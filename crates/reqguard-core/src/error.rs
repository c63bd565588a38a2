//! # Error Types
//!
//! Errors raised while interpreting request-part names and configuration
//! paths. All errors use `thiserror`.

use thiserror::Error;

/// Error in the foundational reqguard types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A name that is not one of the six recognized request parts.
    #[error("unknown request part '{0}'; expected one of params, body, query, headers, cookies, files")]
    UnknownPart(String),

    /// A nested configuration path could not be parsed.
    #[error("invalid schema path '{path}': {reason}")]
    InvalidPath {
        /// The path as supplied.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// A bundle was built from a JSON value that is not an object.
    #[error("validation target must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}
