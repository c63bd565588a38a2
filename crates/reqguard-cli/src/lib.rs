//! # reqguard-cli — Offline Route Schema Tooling
//!
//! Provides the `reqguard` command-line interface for working with route
//! configuration documents outside a running server.
//!
//! ## Subcommands
//!
//! - `reqguard inspect`: show the normalized composite schema of a route.
//! - `reqguard check`: validate a request fixture against a route.
//!
//! ```bash
//! reqguard inspect routes/create_user.json
//! reqguard check routes/create_user.yaml fixtures/ok.json --parse
//! reqguard check routes/nested.json req.json --schema-path 'options[schema]'
//! ```

pub mod check;
pub mod inspect;

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Load a JSON or YAML document. Files ending in `.yaml` or `.yml` are read
/// as YAML, everything else as JSON.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML from {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON from {}", path.display()))
    }
}

/// Load a document that must be a JSON object.
pub fn load_object(path: &Path) -> Result<Value> {
    let value = load_document(path)?;
    if !value.is_object() {
        bail!("{} must contain an object", path.display());
    }
    Ok(value)
}
