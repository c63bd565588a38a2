//! # Check Subcommand
//!
//! Validates a request fixture against a route configuration exactly as
//! the middleware would, without an HTTP server.
//!
//! A fixture is an object keyed by part name:
//!
//! ```yaml
//! params: { id: "42" }
//! query: { page: "2" }
//! body: { name: "ada" }
//! ```
//!
//! Parts the fixture omits take the values an empty request would have:
//! `null` for `body`, `{}` for the rest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use reqguard_axum::{RequestData, RouteConfig, Validator};
use reqguard_core::{RequestPart, ValidationTarget};
use reqguard_schema::{evaluate, resolve, Outcome};
use serde_json::Value;

/// Arguments for the `reqguard check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Route configuration document (JSON or YAML).
    #[arg(value_name = "ROUTE")]
    pub route: PathBuf,

    /// Request fixture keyed by part name (JSON or YAML).
    #[arg(value_name = "REQUEST")]
    pub request: PathBuf,

    /// Nested path of the schema inside the route configuration.
    #[arg(long)]
    pub schema_path: Option<String>,

    /// Coerce values to the schema's types before validating.
    #[arg(long)]
    pub parse: bool,

    /// Directory of shared schemas available to `$ref`.
    #[arg(long, value_name = "DIR")]
    pub schemas: Option<PathBuf>,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 when valid or no schema applies, 1 on violations.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let route = RouteConfig::new(crate::load_object(&args.route)?);
    let fixture = crate::load_object(&args.request)?;

    let mut builder = Validator::builder().parse(args.parse);
    if let Some(path) = &args.schema_path {
        builder = builder.schema_path(path.as_str());
    }
    if let Some(dir) = &args.schemas {
        builder = builder.schema_dir(dir);
    }
    let guard = builder.build().context("invalid validator configuration")?;

    let Some(schema) = resolve(route.document(), guard.schema_path()) else {
        println!("No schema applies to {}; request passes", args.route.display());
        return Ok(0);
    };

    let bundle = ValidationTarget::from_value(fixture).context("invalid request fixture")?;
    let target = fixture_data(&bundle).target(schema.declared_parts());
    let parse = guard.parse_options_for(&route);

    let outcome = evaluate(&schema, guard.registry(), target, parse.as_ref())
        .context("route schema does not compile")?;

    match outcome {
        Outcome::Valid { raw, parsed } => {
            let values = parsed.unwrap_or(raw);
            println!("Request is valid.");
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(0)
        }
        Outcome::Invalid(violations) => {
            println!("Request is invalid ({} violation(s)):", violations.len());
            for violation in violations.violations() {
                println!("{violation}");
            }
            Ok(1)
        }
    }
}

/// Lay a fixture over an empty request.
fn fixture_data(bundle: &ValidationTarget) -> RequestData {
    let mut data = RequestData::default();
    for (part, value) in bundle.iter() {
        let slot: &mut Value = match part {
            RequestPart::Params => &mut data.params,
            RequestPart::Body => &mut data.body,
            RequestPart::Query => &mut data.query,
            RequestPart::Headers => &mut data.headers,
            RequestPart::Cookies => &mut data.cookies,
            RequestPart::Files => &mut data.files,
        };
        *slot = value.clone();
    }
    data
}
