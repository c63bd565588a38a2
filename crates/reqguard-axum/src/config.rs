//! # Configuration
//!
//! Two layers of configuration drive the middleware:
//!
//! - [`ValidatorConfig`]: middleware-wide defaults fixed at construction
//!   (parsing on/off, body limit, where the schema lives in route
//!   configuration, shared schema directory). Loadable from `REQGUARD_*`
//!   environment variables.
//! - [`RouteConfig`]: per-route configuration, attached to a route with
//!   `Extension(route_config)`. Holds the schema document and the per-route
//!   overrides for parsing and error handling.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use reqguard_core::CoreError;
use reqguard_schema::{ParseOptions, SchemaError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::handler::{ErrorHandler, SharedErrorHandler};

/// Default request body limit (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Route-configuration key holding the per-route error handler.
pub const ERROR_HANDLER_KEY: &str = "error_handler";

/// Route-configuration key holding the per-route parsing override.
pub const PARSE_KEY: &str = "parse";

/// Error building the validation middleware.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The schema path could not be parsed.
    #[error("invalid schema path: {0}")]
    SchemaPath(#[from] CoreError),

    /// An environment variable held an unusable value.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The shared schema directory could not be loaded.
    #[error("schema registry: {0}")]
    Registry(#[from] SchemaError),
}

/// Middleware-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Coerce values to the schema's declared types before validating.
    pub parse: bool,
    /// Coercion options used when parsing is enabled without a structured
    /// per-route override.
    pub parse_options: ParseOptions,
    /// Maximum buffered body size in bytes.
    pub body_limit: usize,
    /// Nested path of the schema inside route configuration; `None` means
    /// the configuration root.
    pub schema_path: Option<String>,
    /// Directory of shared `*.schema.json` / `*.schema.yaml` files.
    pub schema_dir: Option<PathBuf>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            parse: false,
            parse_options: ParseOptions::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            schema_path: None,
            schema_dir: None,
        }
    }
}

impl ValidatorConfig {
    /// Configuration with parsing switched on.
    pub fn parsing() -> Self {
        Self {
            parse: true,
            ..Self::default()
        }
    }

    /// Load configuration from the process environment.
    ///
    /// | Variable                  | Field                          |
    /// |---------------------------|--------------------------------|
    /// | `REQGUARD_PARSE`          | `parse`                        |
    /// | `REQGUARD_STRIP_UNKNOWN`  | `parse_options.strip_unknown`  |
    /// | `REQGUARD_APPLY_DEFAULTS` | `parse_options.apply_defaults` |
    /// | `REQGUARD_BODY_LIMIT`     | `body_limit` (bytes)           |
    /// | `REQGUARD_SCHEMA_PATH`    | `schema_path`                  |
    /// | `REQGUARD_SCHEMA_DIR`     | `schema_dir`                   |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let flag = |var: &str, default: bool| match lookup(var) {
            Some(value) => parse_flag(var, &value),
            None => Ok(default),
        };

        let body_limit = match lookup("REQGUARD_BODY_LIMIT") {
            Some(value) => value.trim().parse().map_err(|e| ConfigError::InvalidEnv {
                var: "REQGUARD_BODY_LIMIT".to_string(),
                reason: format!("{e}"),
            })?,
            None => defaults.body_limit,
        };

        Ok(Self {
            parse: flag("REQGUARD_PARSE", defaults.parse)?,
            parse_options: ParseOptions {
                strip_unknown: flag("REQGUARD_STRIP_UNKNOWN", false)?,
                apply_defaults: flag("REQGUARD_APPLY_DEFAULTS", false)?,
            },
            body_limit,
            schema_path: lookup("REQGUARD_SCHEMA_PATH").filter(|p| !p.is_empty()),
            schema_dir: lookup("REQGUARD_SCHEMA_DIR")
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Per-route parsing override: a plain toggle or structured options.
///
/// ```json
/// { "parse": true }
/// { "parse": { "strip_unknown": true, "apply_defaults": true } }
/// { "parse": { "enabled": false } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParseSetting {
    /// Switch parsing on (with the middleware's options) or off.
    Toggle(bool),
    /// Structured options; parsing is on unless `enabled` is false.
    Options(ParseOverride),
}

/// Structured per-route parsing options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParseOverride {
    /// Whether parsing runs at all.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Coercion options.
    #[serde(flatten)]
    pub options: ParseOptions,
}

fn enabled_by_default() -> bool {
    true
}

impl ParseSetting {
    /// Effective coercion options, or `None` when parsing is off.
    pub fn options(&self, fallback: &ParseOptions) -> Option<ParseOptions> {
        match self {
            ParseSetting::Toggle(true) => Some(fallback.clone()),
            ParseSetting::Toggle(false) => None,
            ParseSetting::Options(o) => o.enabled.then(|| o.options.clone()),
        }
    }
}

/// Per-route configuration.
///
/// The JSON document holds the schema (at the middleware's schema path,
/// or at its root) and an optional `parse` override. Error handlers are
/// code, so they are attached with [`RouteConfig::with_error_handler`];
/// an `error_handler` entry in the document cannot be called and is
/// ignored with a warning.
#[derive(Clone, Default)]
pub struct RouteConfig {
    document: Value,
    error_handler: Option<SharedErrorHandler>,
    parse: Option<ParseSetting>,
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("document", &self.document)
            .field("error_handler", &self.error_handler.as_ref().map(|_| "<fn>"))
            .field("parse", &self.parse)
            .finish()
    }
}

impl RouteConfig {
    /// Wrap a route configuration document.
    pub fn new(document: Value) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    /// Attach a per-route error handler.
    pub fn with_error_handler(self, handler: impl ErrorHandler) -> Self {
        self.with_shared_error_handler(Arc::new(handler))
    }

    /// Attach an already-shared per-route error handler.
    pub fn with_shared_error_handler(mut self, handler: SharedErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Override parsing for this route. Takes precedence over a `parse`
    /// entry in the document.
    pub fn with_parse(mut self, setting: ParseSetting) -> Self {
        self.parse = Some(setting);
        self
    }

    /// The configuration document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The per-route parsing override, if any.
    pub fn parse_setting(&self) -> Option<ParseSetting> {
        if let Some(setting) = &self.parse {
            return Some(setting.clone());
        }
        let raw = self.document.get(PARSE_KEY)?;
        match ParseSetting::deserialize(raw) {
            Ok(setting) => Some(setting),
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed per-route parse override");
                None
            }
        }
    }

    /// The per-route error handler, if one is callable.
    pub fn error_handler(&self) -> Option<&SharedErrorHandler> {
        if self.error_handler.is_some() {
            return self.error_handler.as_ref();
        }
        if let Some(value) = self.document.get(ERROR_HANDLER_KEY).filter(|v| !v.is_null()) {
            tracing::warn!(
                configured = %value,
                "per-route error handler is not a function; ignoring"
            );
        }
        None
    }
}
