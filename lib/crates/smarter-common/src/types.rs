use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::manifest::{API_VERSION, Kind};

/// Deployment lifecycle of a deployable resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    #[default]
    NotDeployed,
    Deploying,
    Deployed,
    Failed,
}

impl DeployState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeployState::NotDeployed => "not_deployed",
            DeployState::Deploying => "deploying",
            DeployState::Deployed => "deployed",
            DeployState::Failed => "failed",
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_deployed" => Ok(DeployState::NotDeployed),
            "deploying" => Ok(DeployState::Deploying),
            "deployed" => Ok(DeployState::Deployed),
            "failed" => Ok(DeployState::Failed),
            other => Err(format!("unknown deploy state '{other}'")),
        }
    }
}

/// Verbs a broker answers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Apply,
    Get,
    Delete,
    Deploy,
    Undeploy,
    Describe,
    Logs,
    Status,
    Schema,
    Example,
}

impl Verb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Apply => "apply",
            Verb::Get => "get",
            Verb::Delete => "delete",
            Verb::Deploy => "deploy",
            Verb::Undeploy => "undeploy",
            Verb::Describe => "describe",
            Verb::Logs => "logs",
            Verb::Status => "status",
            Verb::Schema => "schema",
            Verb::Example => "example",
        }
    }

    /// Verbs that address a single named resource.
    #[must_use]
    pub const fn requires_name(self) -> bool {
        matches!(
            self,
            Verb::Delete
                | Verb::Deploy
                | Verb::Undeploy
                | Verb::Describe
                | Verb::Logs
                | Verb::Status
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s.to_ascii_lowercase().as_str() {
            "apply" => Verb::Apply,
            "get" => Verb::Get,
            "delete" => Verb::Delete,
            "deploy" => Verb::Deploy,
            "undeploy" => Verb::Undeploy,
            "describe" => Verb::Describe,
            "logs" => Verb::Logs,
            "status" => Verb::Status,
            "schema" => Verb::Schema,
            "example" => Verb::Example,
            other => return Err(format!("unknown verb '{other}'")),
        };
        Ok(verb)
    }
}

/// What a successful broker call did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Created,
    Updated,
    Deleted,
    Deploying,
    Undeployed,
    Ok,
}

/// Uniform success envelope for every verb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerResponse {
    pub api_version: String,
    pub kind: Kind,
    pub verb: Verb,
    pub outcome: Outcome,
    /// Changed field paths; present only for `apply` updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<Vec<String>>,
    pub data: serde_json::Value,
}

impl BrokerResponse {
    #[must_use]
    pub fn new(kind: Kind, verb: Verb, outcome: Outcome, data: serde_json::Value) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind,
            verb,
            outcome,
            changed: None,
            data,
        }
    }

    #[must_use]
    pub fn with_changed(mut self, changed: Vec<String>) -> Self {
        self.changed = Some(changed);
        self
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path into the manifest, e.g. `spec.config.defaultTemperature`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Stable JSON error shape rendered at the CLI/HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}
