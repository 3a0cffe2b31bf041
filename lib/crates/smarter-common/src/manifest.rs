// lib/crates/smarter-common/src/manifest.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::DeployState;

/// The only manifest `apiVersion` this broker accepts.
pub const API_VERSION: &str = "smarter.sh/v1";

/// Resource kinds a manifest may declare.
///
/// The set is closed: every variant has exactly one broker in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Account,
    User,
    ApiKey,
    Secret,
    SqlConnection,
    ApiConnection,
    Plugin,
    ChatBot,
}

/// Returned when a kind string does not name a registered kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind '{0}'")]
pub struct UnknownKind(pub String);

impl Kind {
    /// Every kind, in registry order.
    pub const ALL: [Kind; 8] = [
        Kind::Account,
        Kind::User,
        Kind::ApiKey,
        Kind::Secret,
        Kind::SqlConnection,
        Kind::ApiConnection,
        Kind::Plugin,
        Kind::ChatBot,
    ];

    /// Canonical manifest spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Kind::Account => "Account",
            Kind::User => "User",
            Kind::ApiKey => "ApiKey",
            Kind::Secret => "Secret",
            Kind::SqlConnection => "SqlConnection",
            Kind::ApiConnection => "ApiConnection",
            Kind::Plugin => "Plugin",
            Kind::ChatBot => "ChatBot",
        }
    }

    /// Position of this kind in [`Kind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Only ChatBots and Plugins have a deployment lifecycle.
    #[must_use]
    pub const fn is_deployable(self) -> bool {
        matches!(self, Kind::ChatBot | Kind::Plugin)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = UnknownKind;

    /// Case-insensitive; accepts the plural CLI form (`chatbots`) and
    /// ignores `-`/`_` separators (`api-key`, `sql_connection`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Kind::ALL
            .into_iter()
            .find(|kind| {
                let canonical = kind.as_str().to_ascii_lowercase();
                folded == canonical || folded.strip_suffix('s') == Some(canonical.as_str())
            })
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Kind-independent manifest metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Read-only status block emitted by `describe`. Ignored by `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStatus {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deploy_state: DeployState,
}

/// A complete manifest document with a typed `spec`.
///
/// `describe` produces `ManifestDocument<serde_json::Value>`; typed
/// instantiations are used by tests and examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument<S> {
    pub api_version: String,
    pub kind: Kind,
    pub metadata: Metadata,
    pub spec: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ManifestStatus>,
}

impl<S> ManifestDocument<S> {
    /// Build a document with the current `apiVersion` and no status.
    pub fn new(kind: Kind, metadata: Metadata, spec: S) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind,
            metadata,
            spec,
            status: None,
        }
    }
}
