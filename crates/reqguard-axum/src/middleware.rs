//! # Validation Middleware
//!
//! [`validate_request`] runs for every request on a route it is layered
//! onto. The route's [`RouteConfig`] must be layered outside it so it is
//! already in request extensions:
//!
//! ```ignore
//! let guard = reqguard_axum::validator(None, None, None)?;
//! let app = Router::new()
//!     .route("/users", post(create_user))
//!     .route_layer(middleware::from_fn_with_state(guard, validate_request))
//!     .route_layer(Extension(RouteConfig::new(json!({
//!         "body": { "name": { "type": "string", "required": true } }
//!     }))));
//! ```
//!
//! ## Request Flow
//!
//! 1. No route configuration, or no schema at the configured path: pass
//!    through untouched.
//! 2. Read the declared parts off the request ([`crate::extract`]).
//! 3. Compile, optionally coerce, validate ([`reqguard_schema::evaluate`]).
//! 4. Valid: write parsed values back, attach [`Validated`] and
//!    [`RequestData`](crate::RequestData), continue.
//! 5. Invalid: dispatch to the route handler, the default handler, or the
//!    built-in `400` response.
//!
//! A schema that fails to compile yields `500`; an oversized body `413`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use reqguard_core::{RequestPart, SchemaPath};
use reqguard_schema::{evaluate, resolve, Outcome, ParseOptions, SchemaRegistry};

use crate::config::{ConfigError, RouteConfig, ValidatorConfig};
use crate::error::AppError;
use crate::extract::{extract, rewrite_json_body, Extracted};
use crate::extractors::Validated;
use crate::handler::{select, ErrorHandler, SharedErrorHandler, ValidationFailure};

/// Middleware state: configuration, schema path, default error handler,
/// and shared schemas. Cheap to clone.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<ValidatorInner>,
}

struct ValidatorInner {
    config: ValidatorConfig,
    schema_path: Option<SchemaPath>,
    on_error: Option<SharedErrorHandler>,
    registry: SchemaRegistry,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.inner.config)
            .field("schema_path", &self.inner.schema_path)
            .field("on_error", &self.inner.on_error.as_ref().map(|_| "<fn>"))
            .field("schemas", &self.inner.registry.schema_count())
            .finish()
    }
}

/// Build a validator.
///
/// `config` defaults to [`ValidatorConfig::default`]. `schema_path`, when
/// given, overrides `config.schema_path`.
///
/// # Errors
///
/// Returns [`ConfigError::SchemaPath`] for a malformed schema path and
/// [`ConfigError::Registry`] when the configured schema directory cannot
/// be loaded.
pub fn validator(
    config: Option<ValidatorConfig>,
    on_error: Option<SharedErrorHandler>,
    schema_path: Option<&str>,
) -> Result<Validator, ConfigError> {
    let mut builder = Validator::builder().config(config.unwrap_or_default());
    if let Some(handler) = on_error {
        builder = builder.shared_error_handler(handler);
    }
    if let Some(path) = schema_path {
        builder = builder.schema_path(path);
    }
    builder.build()
}

impl Validator {
    /// Start building a validator.
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Middleware-wide configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.inner.config
    }

    /// Where the schema lives in route configuration; `None` is the root.
    pub fn schema_path(&self) -> Option<&SchemaPath> {
        self.inner.schema_path.as_ref()
    }

    /// Shared schemas available to `$ref`.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    /// Coercion options for a route, or `None` when parsing is off. A
    /// per-route override wins over the middleware setting.
    pub fn parse_options_for(&self, route: &RouteConfig) -> Option<ParseOptions> {
        let config = &self.inner.config;
        match route.parse_setting() {
            Some(setting) => setting.options(&config.parse_options),
            None => config.parse.then(|| config.parse_options.clone()),
        }
    }

    fn default_error_handler(&self) -> Option<&SharedErrorHandler> {
        self.inner.on_error.as_ref()
    }
}

/// Builder for [`Validator`].
#[derive(Default)]
pub struct ValidatorBuilder {
    config: ValidatorConfig,
    on_error: Option<SharedErrorHandler>,
    registry: Option<SchemaRegistry>,
}

impl ValidatorBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable parsing.
    pub fn parse(mut self, parse: bool) -> Self {
        self.config.parse = parse;
        self
    }

    /// Coercion options used when parsing.
    pub fn parse_options(mut self, options: ParseOptions) -> Self {
        self.config.parse_options = options;
        self
    }

    /// Maximum buffered body size in bytes.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.config.body_limit = limit;
        self
    }

    /// Nested path of the schema inside route configuration.
    pub fn schema_path(mut self, path: impl Into<String>) -> Self {
        self.config.schema_path = Some(path.into());
        self
    }

    /// Load shared schemas from a directory at build time.
    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.schema_dir = Some(dir.into());
        self
    }

    /// Use an already-loaded registry. Takes precedence over
    /// [`schema_dir`](Self::schema_dir).
    pub fn registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Default error handler for routes without their own.
    pub fn error_handler(self, handler: impl ErrorHandler) -> Self {
        self.shared_error_handler(Arc::new(handler))
    }

    /// Default error handler, already shared.
    pub fn shared_error_handler(mut self, handler: SharedErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Finish the validator.
    ///
    /// # Errors
    ///
    /// See [`validator`].
    pub fn build(self) -> Result<Validator, ConfigError> {
        let schema_path = self
            .config
            .schema_path
            .as_deref()
            .map(SchemaPath::parse)
            .transpose()?
            .filter(|path| !path.is_root());

        let registry = match (self.registry, &self.config.schema_dir) {
            (Some(registry), _) => registry,
            (None, Some(dir)) => SchemaRegistry::load_dir(dir)?,
            (None, None) => SchemaRegistry::new(),
        };

        tracing::debug!(
            parse = self.config.parse,
            body_limit = self.config.body_limit,
            schema_path = ?self.config.schema_path,
            schemas = registry.schema_count(),
            "request validator configured"
        );

        Ok(Validator {
            inner: Arc::new(ValidatorInner {
                config: self.config,
                schema_path,
                on_error: self.on_error,
                registry,
            }),
        })
    }
}

/// Validate the request against its route's schema.
///
/// Use with `axum::middleware::from_fn_with_state(validator, validate_request)`.
pub async fn validate_request(
    State(validator): State<Validator>,
    request: Request,
    next: Next,
) -> Response {
    let Some(route) = request.extensions().get::<RouteConfig>().cloned() else {
        tracing::debug!(uri = %request.uri(), "no route configuration; skipping validation");
        return next.run(request).await;
    };

    let Some(schema) = resolve(route.document(), validator.schema_path()) else {
        tracing::debug!(uri = %request.uri(), "route has no schema; skipping validation");
        return next.run(request).await;
    };
    let declared = schema.declared_parts();

    let Extracted {
        mut request,
        mut data,
        json_body,
    } = match extract(request, declared, validator.config().body_limit).await {
        Ok(extracted) => extracted,
        Err(err) => return err.into_response(),
    };

    let target = data.target(declared);
    let parse = validator.parse_options_for(&route);
    let outcome = match evaluate(&schema, validator.registry(), target, parse.as_ref()) {
        Ok(outcome) => outcome,
        Err(err) => return AppError::from(err).into_response(),
    };

    match outcome {
        Outcome::Valid { raw, parsed } => {
            if let Some(parsed) = &parsed {
                let written = data.apply_parsed(parsed);
                tracing::debug!(parts = ?written, "parsed values written to request");
                if let Some(body) = parsed.get(RequestPart::Body) {
                    if json_body && raw.get(RequestPart::Body) != Some(body) {
                        request = rewrite_json_body(request, body);
                    }
                }
            }
            let extensions = request.extensions_mut();
            extensions.insert(Validated(parsed.unwrap_or(raw)));
            extensions.insert(data);
            next.run(request).await
        }
        Outcome::Invalid(violations) => {
            let failure = ValidationFailure::from(violations);
            let (dispatch, handler) =
                select(route.error_handler(), validator.default_error_handler());
            tracing::debug!(
                uri = %request.uri(),
                violations = failure.len(),
                handler = dispatch.as_str(),
                "request failed validation"
            );
            request.extensions_mut().insert(data);
            match handler {
                Some(handler) => handler.handle(failure, request, next).await,
                None => failure.into_response(),
            }
        }
    }
}
