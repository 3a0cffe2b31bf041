//! YAML renderer for `-o yaml`.

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct YamlRenderer;

impl YamlRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        print!("{}", to_yaml(value)?);
        Ok(())
    }
}

/// Serialize `value` as a YAML document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("YAML serialization failed")
}
