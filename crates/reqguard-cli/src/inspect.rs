//! # Inspect Subcommand
//!
//! Prints the composite schema a route configuration normalizes to, and
//! the request parts it declares.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use reqguard_axum::validator;
use reqguard_schema::{resolve, CompositeSchema};

/// Arguments for the `reqguard inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Route configuration document (JSON or YAML).
    #[arg(value_name = "ROUTE")]
    pub route: PathBuf,

    /// Nested path of the schema inside the route configuration.
    #[arg(long)]
    pub schema_path: Option<String>,
}

/// Execute the inspect subcommand.
///
/// Returns exit code 0; a route without a schema is reported, not failed.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let document = crate::load_object(&args.route)?;
    let guard = validator(None, None, args.schema_path.as_deref())
        .context("invalid --schema-path")?;

    match resolve(&document, guard.schema_path()) {
        Some(schema) => print_schema(&schema)?,
        None => println!("No schema applies to {}", args.route.display()),
    }
    Ok(0)
}

fn print_schema(schema: &CompositeSchema) -> Result<()> {
    let parts: Vec<&str> = schema.declared_parts().iter().map(|p| p.as_str()).collect();
    println!("Declared parts: {}", parts.join(", "));
    println!("{}", serde_json::to_string_pretty(schema.schema())?);
    Ok(())
}
