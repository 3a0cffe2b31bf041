//! Manifest loader: text in, untyped document out.
//!
//! Only syntax and the presence of the four envelope keys are checked here.

use std::path::Path;

use serde_json::{Map, Value};

use crate::domain::error::BrokerError;

/// Top-level keys every manifest must carry.
pub const REQUIRED_KEYS: [&str; 4] = ["apiVersion", "kind", "metadata", "spec"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "yaml",
            ManifestFormat::Json => "json",
        }
    }

    /// Format implied by a file extension, if any.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ManifestFormat::Yaml),
            "json" => Some(ManifestFormat::Json),
            _ => None,
        }
    }

    /// Format implied by an HTTP `Content-Type` header, if any.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence.ends_with("json") {
            Some(ManifestFormat::Json)
        } else if essence.ends_with("yaml") || essence.ends_with("yml") {
            Some(ManifestFormat::Yaml)
        } else {
            None
        }
    }

    /// Sniff the content: JSON documents start with `{`.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            ManifestFormat::Json
        } else {
            ManifestFormat::Yaml
        }
    }
}

/// A parsed but unvalidated manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct RawManifest {
    pub format: ManifestFormat,
    document: Map<String, Value>,
}

impl RawManifest {
    /// The `kind` string exactly as written.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.document
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `metadata.name`, when present and a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.document.get("metadata")?.get("name")?.as_str()
    }

    /// Look up a value by dotted path (`spec.data.type`).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.document.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    #[must_use]
    pub fn into_document(self) -> Map<String, Value> {
        self.document
    }
}

/// Parse manifest text.
///
/// `format` falls back to content sniffing when `None`.
///
/// # Errors
///
/// `ManifestSyntax` when the text does not parse, `ManifestStructure` when
/// the document is not a mapping or lacks envelope keys.
pub fn load(text: &str, format: Option<ManifestFormat>) -> Result<RawManifest, BrokerError> {
    let format = format.unwrap_or_else(|| ManifestFormat::detect(text));
    let value: Value = match format {
        ManifestFormat::Yaml => serde_yaml::from_str(text).map_err(|e| syntax(format, &e))?,
        ManifestFormat::Json => serde_json::from_str(text).map_err(|e| syntax(format, &e))?,
    };

    let Value::Object(document) = value else {
        return Err(BrokerError::ManifestStructure {
            message: format!("manifest must be a mapping, found {}", type_name(&value)),
            missing: vec![],
        });
    };

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| document.get(**key).is_none_or(Value::is_null))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(BrokerError::ManifestStructure {
            message: format!("manifest is missing required keys: {}", missing.join(", ")),
            missing,
        });
    }
    if !document.get("kind").is_some_and(Value::is_string) {
        return Err(BrokerError::ManifestStructure {
            message: "manifest 'kind' must be a string".to_string(),
            missing: vec![],
        });
    }

    Ok(RawManifest { format, document })
}

fn syntax(format: ManifestFormat, err: &dyn std::fmt::Display) -> BrokerError {
    BrokerError::ManifestSyntax {
        format: format.as_str(),
        message: err.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
