//! Persistent resource records and their journal.
//!
//! Pure types and functions; no I/O, no async.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smarter_common::{DeployState, Kind};

/// Identity of a record: unique per `(account, kind, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub account: String,
    pub kind: Kind,
    pub name: String,
}

impl ResourceKey {
    pub fn new(account: impl Into<String>, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            kind,
            name: name.into(),
        }
    }

    /// Same account, different kind/name.
    #[must_use]
    pub fn sibling(&self, kind: Kind, name: impl Into<String>) -> Self {
        Self::new(self.account.clone(), kind, name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.kind, self.name)
    }
}

/// An outgoing reference from one record to another in the same account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub kind: Kind,
    pub name: String,
}

impl Reference {
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Normalized values an `apply` wants to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDraft {
    pub key: ResourceKey,
    pub variant: Option<String>,
    pub description: String,
    pub version: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub spec: serde_json::Value,
    pub references: Vec<Reference>,
    /// References that must exist when the draft is written.
    pub required: Vec<Reference>,
}

/// A stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub id: i64,
    pub key: ResourceKey,
    pub variant: Option<String>,
    pub description: String,
    pub version: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub spec: serde_json::Value,
    pub references: Vec<Reference>,
    pub deploy_state: DeployState,
    pub deploy_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Child row of an ApiKey: the hashed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub digest: String,
    pub prefix: String,
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(ResourceRecord),
    /// `changed` is empty when nothing differed and no write happened.
    Updated {
        record: ResourceRecord,
        changed: Vec<String>,
    },
}

impl UpsertOutcome {
    #[must_use]
    pub fn record(&self) -> &ResourceRecord {
        match self {
            UpsertOutcome::Created(record) | UpsertOutcome::Updated { record, .. } => record,
        }
    }
}

/// Journal entry types backing the `logs` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    DeployRequested,
    DeployRetry,
    Deployed,
    DeployFailed,
    Undeployed,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::DeployRequested => "deploy_requested",
            EventKind::DeployRetry => "deploy_retry",
            EventKind::Deployed => "deployed",
            EventKind::DeployFailed => "deploy_failed",
            EventKind::Undeployed => "undeployed",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            EventKind::Created,
            EventKind::Updated,
            EventKind::DeployRequested,
            EventKind::DeployRetry,
            EventKind::Deployed,
            EventKind::DeployFailed,
            EventKind::Undeployed,
        ]
        .into_iter()
        .find(|e| e.as_str() == s)
        .ok_or_else(|| format!("unknown event '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub at: DateTime<Utc>,
    pub event: EventKind,
    pub message: String,
}

/// Fields of `record` that `draft` would change.
///
/// Spec changes are reported per top-level key (`spec.config`), so a
/// re-applied `describe` document yields an empty list.
#[must_use]
pub fn diff(draft: &ResourceDraft, record: &ResourceRecord) -> Vec<String> {
    let mut changed = Vec::new();
    if draft.description != record.description {
        changed.push("description".to_string());
    }
    if draft.version != record.version {
        changed.push("version".to_string());
    }
    if draft.labels != record.labels {
        changed.push("labels".to_string());
    }
    match (&draft.spec, &record.spec) {
        (serde_json::Value::Object(new), serde_json::Value::Object(old)) => {
            let keys: BTreeSet<&String> = new.keys().chain(old.keys()).collect();
            changed.extend(
                keys.into_iter()
                    .filter(|k| new.get(*k) != old.get(*k))
                    .map(|k| format!("spec.{k}")),
            );
        }
        (new, old) if new != old => changed.push("spec".to_string()),
        _ => {}
    }
    changed
}
