use serde_json::Value;
use smarter_common::kinds::{SECRET_MASK, SecretSpec};
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{Transformer, example_metadata, to_json};
use crate::domain::manifest::ValidatedManifest;
use crate::domain::{BrokerError, ResourceRecord};

/// `describe` masks the value; applying the mask keeps the stored value.
pub struct SecretTransformer;

impl Transformer for SecretTransformer {
    type Spec = SecretSpec;

    const KIND: Kind = Kind::Secret;

    fn example() -> ManifestDocument<SecretSpec> {
        ManifestDocument::new(
            Kind::Secret,
            example_metadata("stackademy-db-password", "Read-only database password"),
            SecretSpec {
                value: "change-me".to_string(),
                expires_at: Some("2027-12-31".to_string()),
            },
        )
    }

    fn check(spec: &SecretSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if spec.value.is_empty() {
            errors.push(FieldError::new("spec.value", "must not be empty"));
        }
        if let Some(expires) = &spec.expires_at {
            if chrono::NaiveDate::parse_from_str(expires, "%Y-%m-%d").is_err() {
                errors.push(FieldError::new(
                    "spec.expiresAt",
                    format!("'{expires}' is not a YYYY-MM-DD date"),
                ));
            }
        }
        errors
    }

    fn to_record_spec(
        manifest: &ValidatedManifest<SecretSpec>,
        existing: Option<&ResourceRecord>,
    ) -> Result<Value, BrokerError> {
        let spec = manifest.spec();
        if !spec.is_masked() {
            return to_json(spec);
        }
        let stored = existing
            .and_then(|record| record.spec.get("value"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BrokerError::invalid(
                    Kind::Secret,
                    "spec.value",
                    "the masked value can only be applied to an existing secret",
                )
            })?;
        to_json(&SecretSpec {
            value: stored.to_string(),
            expires_at: spec.expires_at.clone(),
        })
    }

    fn to_manifest_spec(record: &ResourceRecord) -> Value {
        let mut spec = record.spec.clone();
        if let Some(value) = spec.get_mut("value") {
            *value = Value::String(SECRET_MASK.to_string());
        }
        spec
    }
}
