//! # Handler Extractors
//!
//! [`Validated`] is the post-validation accessor: the bundle that passed
//! the schema, parsed when parsing ran. Unlike [`RequestData`] it includes
//! the parsed query string.
//!
//! Both extractors reject with `500` on a route without the validation
//! middleware, since that is a wiring mistake rather than a client error.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reqguard_core::{RequestPart, ValidationTarget};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::RequestData;

/// The validated values of the declared request parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated(pub ValidationTarget);

impl Validated {
    /// Value of one part, if the schema declared it.
    pub fn get(&self, part: RequestPart) -> Option<&Value> {
        self.0.get(part)
    }

    /// Value of a part by name (`"body"`, `"query"`, ...).
    pub fn part(&self, name: &str) -> Option<&Value> {
        RequestPart::from_name(name).and_then(|part| self.get(part))
    }

    /// The validated query string.
    pub fn query(&self) -> Option<&Value> {
        self.get(RequestPart::Query)
    }

    /// The validated body.
    pub fn body(&self) -> Option<&Value> {
        self.get(RequestPart::Body)
    }

    /// Deserialize one part into a typed value. An undeclared part
    /// deserializes from `null`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] if the value does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, part: RequestPart) -> Result<T, AppError> {
        let value = self.get(part).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("{part} does not match handler type: {e}")))
    }

    /// The underlying bundle.
    pub fn into_inner(self) -> ValidationTarget {
        self.0
    }
}

impl<S> FromRequestParts<S> for Validated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Validated>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal("Validated requested on a route without validation".into())
            })
    }
}

impl<S> FromRequestParts<S> for RequestData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestData>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal("RequestData requested on a route without validation".into())
            })
    }
}
