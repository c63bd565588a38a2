//! # reqguard-axum — Request Validation Middleware for Axum
//!
//! Validates each request against a JSON Schema carried in its route's
//! configuration, optionally coercing string values to the schema's types
//! first, and answers invalid requests with `400 {"errors": [...]}` or a
//! configured error handler.
//!
//! ## Wiring
//!
//! ```ignore
//! use axum::{middleware, routing::post, Extension, Router};
//! use reqguard_axum::{validate_request, validator, RouteConfig, Validated};
//!
//! let guard = validator(None, None, None)?;
//! let app = Router::new()
//!     .route("/users/{id}", post(update_user))
//!     .route_layer(middleware::from_fn_with_state(guard, validate_request))
//!     .route_layer(Extension(RouteConfig::new(json!({
//!         "params": { "id": { "type": "string", "pattern": "^[0-9]+$" } },
//!         "body": { "name": { "type": "string", "required": true } }
//!     }))));
//!
//! async fn update_user(validated: Validated) -> impl IntoResponse { /* ... */ }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: middleware-wide and per-route configuration.
//! - [`middleware`]: the [`Validator`] state and [`validate_request`].
//! - [`extract`]: reading request parts into [`RequestData`].
//! - [`extractors`]: the [`Validated`] accessor.
//! - [`handler`]: failure envelopes and error handler dispatch.
//! - [`error`]: middleware faults as JSON responses.

pub mod config;
pub mod error;
pub mod extract;
pub mod extractors;
pub mod handler;
pub mod middleware;

pub use config::{ConfigError, ParseOverride, ParseSetting, RouteConfig, ValidatorConfig};
pub use error::AppError;
pub use extract::RequestData;
pub use extractors::Validated;
pub use handler::{ErrorHandler, HandlerFuture, SharedErrorHandler, ValidationFailure};
pub use middleware::{validate_request, validator, Validator, ValidatorBuilder};
