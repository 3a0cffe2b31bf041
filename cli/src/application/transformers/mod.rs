//! Per-kind transformers.
//!
//! A transformer maps a validated manifest to a record draft and a stored
//! record back to a manifest `spec`. It also declares the kind's policy:
//! who may mutate it, what it references, and what its semantic rules are.
//! Transformers are stateless; every method is an associated function.

pub mod account;
pub mod api_key;
pub mod chatbot;
pub mod connection;
pub mod plugin;
pub mod secret;
pub mod user;

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smarter_common::{FieldError, Kind, ManifestDocument, Metadata};

use crate::domain::manifest::ValidatedManifest;
use crate::domain::{BrokerError, Caller, Reference, ResourceRecord};

pub use account::AccountTransformer;
pub use api_key::ApiKeyTransformer;
pub use chatbot::ChatBotTransformer;
pub use connection::{ApiConnectionTransformer, SqlConnectionTransformer};
pub use plugin::{ApiPluginTransformer, SqlPluginTransformer, StaticPluginTransformer};
pub use secret::SecretTransformer;
pub use user::UserTransformer;

/// When a reference must resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAt {
    /// The target must exist when the manifest is applied.
    Apply,
    /// The target must exist when the record is deployed.
    Deploy,
}

/// A reference found at a manifest field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub path: String,
    pub target: Reference,
    pub resolve_at: ResolveAt,
}

impl FieldRef {
    pub fn apply(path: impl Into<String>, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: Reference::new(kind, name),
            resolve_at: ResolveAt::Apply,
        }
    }

    pub fn deploy(path: impl Into<String>, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: Reference::new(kind, name),
            resolve_at: ResolveAt::Deploy,
        }
    }
}

pub trait Transformer: Send + Sync + 'static {
    type Spec: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static;

    const KIND: Kind;

    /// Stored variant tag (Plugin `static|sql|api`).
    const VARIANT: Option<&'static str> = None;

    /// Mutating verbs require an account admin.
    const ADMIN_ONLY: bool = false;

    /// Creating a record issues an API token (returned once).
    const ISSUES_CREDENTIAL: bool = false;

    /// A complete, valid example manifest.
    fn example() -> ManifestDocument<Self::Spec>;

    /// Semantic rules beyond the schema. Paths are rooted at `spec`.
    fn check(_spec: &Self::Spec) -> Vec<FieldError> {
        Vec::new()
    }

    /// Outgoing references, stored on the record.
    fn references(_spec: &Self::Spec) -> Vec<FieldRef> {
        Vec::new()
    }

    /// Extra authorization for `apply`, after the role check.
    ///
    /// # Errors
    ///
    /// `Permission` when the caller may not apply this manifest.
    fn authorize_apply(
        _caller: &Caller,
        _manifest: &ValidatedManifest<Self::Spec>,
    ) -> Result<(), BrokerError> {
        Ok(())
    }

    /// Extra authorization for `delete`.
    ///
    /// # Errors
    ///
    /// `Permission` when the caller may not delete this record.
    fn authorize_delete(_caller: &Caller, _name: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    /// Normalized spec to persist. `existing` is the stored record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the manifest `spec` cannot be persisted as given.
    fn to_record_spec(
        manifest: &ValidatedManifest<Self::Spec>,
        _existing: Option<&ResourceRecord>,
    ) -> Result<Value, BrokerError> {
        to_json(manifest.spec())
    }

    /// Spec as shown by `describe`.
    fn to_manifest_spec(record: &ResourceRecord) -> Value {
        record.spec.clone()
    }
}

/// Serialize a spec for storage.
///
/// # Errors
///
/// Returns `BrokerError::Internal` if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<Value, BrokerError> {
    serde_json::to_value(value).map_err(|e| BrokerError::Internal(format!("cannot encode spec: {e}")))
}

/// Metadata for example manifests.
#[must_use]
pub fn example_metadata(name: &str, description: &str) -> Metadata {
    Metadata {
        name: name.to_string(),
        description: description.to_string(),
        version: Some("1.0.0".to_string()),
        labels: BTreeMap::new(),
    }
}

/// `value` must lie in `min..=max`.
pub(crate) fn check_range(
    errors: &mut Vec<FieldError>,
    path: &str,
    value: f64,
    min: f64,
    max: f64,
) {
    if !(min..=max).contains(&value) {
        errors.push(FieldError::new(
            path,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
}

pub(crate) fn check_positive(errors: &mut Vec<FieldError>, path: &str, value: u32) {
    if value == 0 {
        errors.push(FieldError::new(path, "must be greater than 0"));
    }
}

pub(crate) fn check_name_ref(errors: &mut Vec<FieldError>, path: &str, kind: Kind, name: &str) {
    if let Err(message) = crate::domain::names::validate_name(kind, name) {
        errors.push(FieldError::new(path, message));
    }
}
