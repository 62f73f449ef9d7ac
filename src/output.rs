//! Rendering of fetched credentials for the command line.
//!
//! Supports a JSON object and dotenv-style `NAME="value"` lines.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::ValueEnum;
use tracing::debug;

use crate::fetch::CredentialMap;

/// Output format for `retriever fetch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A single JSON object, keys sorted
    #[default]
    Json,
    /// One `NAME="value"` line per credential
    Env,
}

/// Renders `creds` in `format`, sorted by credential name.
pub fn render(creds: &CredentialMap, format: OutputFormat) -> Result<String> {
    debug!(count = creds.len(), ?format, "Rendering credentials");
    match format {
        OutputFormat::Json => render_json(creds),
        OutputFormat::Env => Ok(render_env(creds)),
    }
}

/// Serializes credentials as pretty-printed JSON.
pub fn render_json(creds: &CredentialMap) -> Result<String> {
    let sorted: BTreeMap<_, _> = creds.iter().collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}

/// Renders credentials as dotenv lines.
///
/// Values are double-quoted with backslashes, quotes, `$` and newlines escaped.
pub fn render_env(creds: &CredentialMap) -> String {
    let sorted: BTreeMap<_, _> = creds.iter().collect();
    sorted
        .into_iter()
        .map(|(name, value)| format!("{}=\"{}\"", env_var_name(name), escape_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Upper-cases `name` and replaces anything outside `[A-Z0-9_]` with `_`.
pub fn env_var_name(name: &str) -> String {
    let mut var: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if var.starts_with(|c: char| c.is_ascii_digit()) {
        var.insert(0, '_');
    }
    var
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
