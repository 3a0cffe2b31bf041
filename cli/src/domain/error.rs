//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use smarter_common::{ErrorBody, FieldError, Kind, UnknownKind};
use thiserror::Error;

use crate::domain::record::Reference;

// ── Store errors ──────────────────────────────────────────────────────────────

/// Failures reported by a `ResourceStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database is busy")]
    Busy,

    #[error("concurrent write conflict on {0}")]
    Conflict(String),

    #[error("account '{0}' does not exist")]
    UnknownAccount(String),

    #[error("{} '{}' does not exist", .0.kind, .0.name)]
    MissingReference(Reference),

    #[error("custom domain '{0}' is already in use")]
    DomainInUse(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Busy databases and lost uniqueness races succeed on a second attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Busy | StoreError::Conflict(_))
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors found while merging or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

// ── Broker errors ─────────────────────────────────────────────────────────────

/// Every failure a broker verb can surface to a caller.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("cannot parse {format} manifest: {message}")]
    ManifestSyntax {
        format: &'static str,
        message: String,
    },

    #[error("{message}")]
    ManifestStructure {
        message: String,
        missing: Vec<String>,
    },

    #[error("{kind} manifest is invalid: {}", summarize(fields))]
    ManifestValidation { kind: Kind, fields: Vec<FieldError> },

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("unknown {kind} variant '{value}' at {field}")]
    UnknownVariant {
        kind: Kind,
        field: String,
        value: String,
    },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: Kind, name: String },

    #[error("{0}")]
    Precondition(String),

    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BrokerError {
    fn from(err: StoreError) -> Self {
        BrokerError::Internal(err.to_string())
    }
}

fn summarize(fields: &[FieldError]) -> String {
    match fields {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl BrokerError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(kind: Kind, path: impl Into<String>, message: impl Into<String>) -> Self {
        BrokerError::ManifestValidation {
            kind,
            fields: vec![FieldError::new(path, message)],
        }
    }

    pub fn not_found(kind: Kind, name: impl Into<String>) -> Self {
        BrokerError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::ManifestSyntax { .. } => "ManifestSyntaxError",
            BrokerError::ManifestStructure { .. } => "ManifestStructureError",
            BrokerError::ManifestValidation { .. } => "ManifestValidationError",
            BrokerError::UnknownKind(_) => "UnknownKindError",
            BrokerError::UnknownVariant { .. } => "UnknownVariantError",
            BrokerError::Permission(_) => "PermissionError",
            BrokerError::NotFound { .. } => "NotFoundError",
            BrokerError::Precondition(_) => "PreconditionError",
            BrokerError::Unauthenticated(_) => "UnauthenticatedError",
            BrokerError::BadRequest(_) => "BadRequestError",
            BrokerError::Internal(_) => "InternalError",
        }
    }

    /// HTTP status the API layer answers with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            BrokerError::ManifestSyntax { .. }
            | BrokerError::ManifestStructure { .. }
            | BrokerError::UnknownKind(_)
            | BrokerError::UnknownVariant { .. }
            | BrokerError::BadRequest(_) => 400,
            BrokerError::Unauthenticated(_) => 401,
            BrokerError::Permission(_) => 403,
            BrokerError::NotFound { .. } => 404,
            BrokerError::Precondition(_) => 409,
            BrokerError::ManifestValidation { .. } => 422,
            BrokerError::Internal(_) => 500,
        }
    }

    /// Field-level details; empty for non-validation errors.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        match self {
            BrokerError::ManifestValidation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Render the stable error object.
    ///
    /// Internal errors carry a generic message; `expose_internal` adds the
    /// underlying failure as `cause` (local CLI only).
    #[must_use]
    pub fn to_body(&self, expose_internal: bool) -> ErrorBody {
        let (message, cause) = match self {
            BrokerError::Internal(inner) => (
                "internal error".to_string(),
                expose_internal.then(|| inner.clone()),
            ),
            BrokerError::ManifestStructure { missing, .. } if !missing.is_empty() => {
                (self.to_string(), Some(format!("missing: {}", missing.join(", "))))
            }
            other => (other.to_string(), None),
        };
        ErrorBody {
            error: true,
            code: self.code().to_string(),
            message,
            fields: self.fields().to_vec(),
            cause,
        }
    }
}
