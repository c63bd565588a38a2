//! # Request Parts
//!
//! The six parts of an HTTP request a schema can describe. A composite
//! schema's top-level properties are named after these parts, and the
//! validation target bundle is keyed by them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A recognized request part.
///
/// Declaration order is the canonical order: bundles iterate parts in this
/// order and declared-part lists are sorted by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPart {
    /// Matched route parameters.
    Params,
    /// Decoded request body.
    Body,
    /// Decoded query string.
    Query,
    /// Request headers.
    Headers,
    /// Cookies from the `Cookie` header.
    Cookies,
    /// Uploaded files from a multipart body.
    Files,
}

impl RequestPart {
    /// All parts in canonical order.
    pub const ALL: [RequestPart; 6] = [
        RequestPart::Params,
        RequestPart::Body,
        RequestPart::Query,
        RequestPart::Headers,
        RequestPart::Cookies,
        RequestPart::Files,
    ];

    /// The part's name as it appears in schemas and bundles.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestPart::Params => "params",
            RequestPart::Body => "body",
            RequestPart::Query => "query",
            RequestPart::Headers => "headers",
            RequestPart::Cookies => "cookies",
            RequestPart::Files => "files",
        }
    }

    /// Look up a part by name. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Whether parsed values for this part may be written back onto the
    /// live request.
    ///
    /// The query string is read-only: its parsed form is only reachable
    /// through the post-validation accessor.
    pub fn is_writable(self) -> bool {
        !matches!(self, RequestPart::Query)
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestPart {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CoreError::UnknownPart(s.to_string()))
    }
}
