//! # Validation Failure Handling
//!
//! When a request fails validation the middleware builds a
//! [`ValidationFailure`] and dispatches it, in order, to:
//!
//! 1. the route's own error handler ([`RouteConfig::with_error_handler`]);
//! 2. the middleware's default error handler;
//! 3. the built-in response: `400 Bad Request` with `{"errors": [...]}`.
//!
//! An error handler receives the failure, the request, and the rest of the
//! middleware chain. It answers by returning a response, or lets the
//! request through by calling `next.run(request)`.
//!
//! [`RouteConfig::with_error_handler`]: crate::config::RouteConfig::with_error_handler

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqguard_schema::{ValidationViolations, Violation};
use serde::Serialize;

/// Boxed future returned by error handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// An error handler shared between routes and requests.
pub type SharedErrorHandler = Arc<dyn ErrorHandler>;

/// The error envelope for a failed validation.
///
/// Serializes to `{"errors": [...]}`, one entry per violation in the order
/// the validator reported them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// Violations, in validator order.
    pub errors: Vec<Violation>,
}

impl ValidationFailure {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<ValidationViolations> for ValidationFailure {
    fn from(violations: ValidationViolations) -> Self {
        Self {
            errors: violations.into_inner(),
        }
    }
}

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Handles a validation failure.
///
/// Implemented for every `Fn(ValidationFailure, Request, Next) -> impl
/// Future<Output = Response>`, so an `async fn` with that signature can be
/// used directly.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Produce the response for `failure`, or continue with
    /// `next.run(request)`.
    fn handle(&self, failure: ValidationFailure, request: Request, next: Next) -> HandlerFuture;
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(ValidationFailure, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, failure: ValidationFailure, request: Request, next: Next) -> HandlerFuture {
        Box::pin(self(failure, request, next))
    }
}

/// Where a failure was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Route,
    Default,
    Builtin,
}

impl Dispatch {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Dispatch::Route => "route",
            Dispatch::Default => "default",
            Dispatch::Builtin => "builtin",
        }
    }
}

/// Pick the handler for a failure: the route's, then the default, then
/// the built-in 400 response.
pub(crate) fn select<'a>(
    route: Option<&'a SharedErrorHandler>,
    default: Option<&'a SharedErrorHandler>,
) -> (Dispatch, Option<&'a SharedErrorHandler>) {
    match (route, default) {
        (Some(handler), _) => (Dispatch::Route, Some(handler)),
        (None, Some(handler)) => (Dispatch::Default, Some(handler)),
        (None, None) => (Dispatch::Builtin, None),
    }
}
