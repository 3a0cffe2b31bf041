//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and the JSON renderer for successful results.

use anyhow::{Context, Result};
use serde::Serialize;
use smarter_common::ErrorBody;

/// Format a JSON error object for a failure that has no broker error code.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    format_error_body(&ErrorBody {
        error: true,
        code: code.to_string(),
        message: message.to_string(),
        fields: Vec::new(),
        cause: None,
    })
}

/// Format a broker error body, including field errors and cause.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error_body(body: &ErrorBody) -> Result<String> {
    serde_json::to_string_pretty(body).context("JSON serialization failed")
}

/// Machine-readable renderer: every result is printed as pretty JSON.
#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }
}
