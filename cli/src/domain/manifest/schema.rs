//! Schema validation: `RawManifest` in, typed `ValidatedManifest` out.
//!
//! Schemas are generated from the Rust spec types with `schemars` and
//! compiled once with `jsonschema`. Validation collects every violation,
//! each with a dotted field path.

use std::marker::PhantomData;

use jsonschema::error::ValidationErrorKind;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smarter_common::{API_VERSION, FieldError, Kind, Metadata};

use crate::domain::error::BrokerError;
use crate::domain::manifest::coerce::coerce;
use crate::domain::manifest::loader::RawManifest;
use crate::domain::names::validate_name;

/// Top-level keys a manifest may carry. `status` is output-only.
const ENVELOPE_KEYS: [&str; 5] = ["apiVersion", "kind", "metadata", "spec", "status"];

/// A compiled JSON Schema plus its source document.
pub struct SchemaValidator {
    schema: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("title", &self.schema.get("title"))
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Generate and compile the schema for `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated schema does not compile.
    pub fn for_type<T: JsonSchema>() -> Result<Self, String> {
        let schema = serde_json::to_value(schemars::schema_for!(T)).map_err(|e| e.to_string())?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| e.to_string())?;
        Ok(Self { schema, validator })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Coerce scalars in `value`, then validate it.
    ///
    /// Error paths are rooted at `prefix` (`spec`, `metadata`).
    pub fn check(&self, value: &mut Value, prefix: &str) -> Vec<FieldError> {
        coerce(value, &self.schema, &self.schema);
        let mut errors: Vec<FieldError> = Vec::new();
        for err in self.validator.iter_errors(value) {
            let base = dotted_path(prefix, &err.instance_path().to_string());
            match err.kind() {
                ValidationErrorKind::Required { property, .. } => {
                    let property = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                    errors.push(FieldError::new(join(&base, &property), "is required"));
                }
                ValidationErrorKind::AdditionalProperties { unexpected, .. } => {
                    errors.extend(
                        unexpected
                            .iter()
                            .map(|field| FieldError::new(join(&base, field), "unknown field")),
                    );
                }
                _ => errors.push(FieldError::new(base, err.to_string())),
            }
        }
        errors.dedup();
        errors
    }
}

/// Convert a JSON pointer (`/config/appExamplePrompts/0`) to a dotted path
/// under `prefix` (`spec.config.appExamplePrompts[0]`).
#[must_use]
pub fn dotted_path(prefix: &str, pointer: &str) -> String {
    let mut path = prefix.to_string();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            path.push_str(&format!("[{segment}]"));
        } else {
            path = join(&path, &segment);
        }
    }
    path
}

fn join(base: &str, field: &str) -> String {
    if base.is_empty() {
        field.to_string()
    } else {
        format!("{base}.{field}")
    }
}

/// A manifest that passed structural, schema and name validation.
///
/// Fields are private: once validated the manifest is not mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedManifest<S> {
    kind: Kind,
    metadata: Metadata,
    spec: S,
}

impl<S> ValidatedManifest<S> {
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn spec(&self) -> &S {
        &self.spec
    }
}

/// Compiled metadata and spec schemas for one kind (or Plugin variant).
pub struct ManifestSchema<S> {
    kind: Kind,
    metadata: SchemaValidator,
    spec: SchemaValidator,
    _spec: PhantomData<fn() -> S>,
}

impl<S: JsonSchema + DeserializeOwned> ManifestSchema<S> {
    /// Compile the schemas for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated schema does not compile.
    pub fn compile(kind: Kind) -> Result<Self, String> {
        Ok(Self {
            kind,
            metadata: SchemaValidator::for_type::<Metadata>()?,
            spec: SchemaValidator::for_type::<S>()?,
            _spec: PhantomData,
        })
    }

    /// JSON Schema of `spec`.
    #[must_use]
    pub fn spec_schema(&self) -> &Value {
        self.spec.schema()
    }

    /// Validate a raw manifest.
    ///
    /// # Errors
    ///
    /// `ManifestValidation` listing every violation found.
    pub fn validate(&self, raw: &RawManifest) -> Result<ValidatedManifest<S>, BrokerError> {
        let document = raw.document();
        let mut errors = envelope_errors(self.kind, document);

        let mut metadata = document.get("metadata").cloned().unwrap_or(Value::Null);
        let mut spec = document.get("spec").cloned().unwrap_or(Value::Null);
        errors.extend(self.metadata.check(&mut metadata, "metadata"));
        errors.extend(self.spec.check(&mut spec, "spec"));
        if !errors.is_empty() {
            return Err(self.invalid(errors));
        }

        let metadata: Metadata = serde_json::from_value(metadata)
            .map_err(|e| self.invalid(vec![FieldError::new("metadata", e.to_string())]))?;
        let spec: S = serde_json::from_value(spec)
            .map_err(|e| self.invalid(vec![FieldError::new("spec", e.to_string())]))?;

        if let Err(message) = validate_name(self.kind, &metadata.name) {
            return Err(self.invalid(vec![FieldError::new("metadata.name", message)]));
        }

        Ok(ValidatedManifest {
            kind: self.kind,
            metadata,
            spec,
        })
    }

    fn invalid(&self, fields: Vec<FieldError>) -> BrokerError {
        BrokerError::ManifestValidation {
            kind: self.kind,
            fields,
        }
    }
}

fn envelope_errors(kind: Kind, document: &Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match document.get("apiVersion").and_then(Value::as_str) {
        Some(API_VERSION) => {}
        Some(other) => errors.push(FieldError::new(
            "apiVersion",
            format!("unsupported apiVersion '{other}', expected {API_VERSION}"),
        )),
        None => errors.push(FieldError::new("apiVersion", "must be a string")),
    }
    let declared = document.get("kind").and_then(Value::as_str).unwrap_or_default();
    if declared.parse::<Kind>().ok() != Some(kind) {
        errors.push(FieldError::new(
            "kind",
            format!("expected {kind}, found '{declared}'"),
        ));
    }
    errors.extend(
        document
            .keys()
            .filter(|key| !ENVELOPE_KEYS.contains(&key.as_str()))
            .map(|key| FieldError::new(key.clone(), "unknown field")),
    );
    errors
}
