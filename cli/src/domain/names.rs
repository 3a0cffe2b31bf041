//! Resource naming rules.
//!
//! Pure functions only; no I/O, no async.

use regex::Regex;
use smarter_common::Kind;
use std::sync::LazyLock;

/// Account numbers: three groups of four digits, e.g. `3141-5926-5359`.
pub static ACCOUNT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, so it cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d{4}-\d{4}-\d{4}$").expect("valid regex")
});

pub static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9._-]{0,149}$").expect("valid regex")
});

/// RFC 1123 label. ChatBot names end up as hostname labels.
pub static DNS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

#[must_use]
pub fn is_account_number(value: &str) -> bool {
    ACCOUNT_NUMBER_RE.is_match(value)
}

#[must_use]
pub fn is_dns_label(value: &str) -> bool {
    DNS_LABEL_RE.is_match(value)
}

/// Check `metadata.name` against the rule for `kind`.
///
/// # Errors
///
/// Returns a human-readable description of the rule that was violated.
pub fn validate_name(kind: Kind, name: &str) -> Result<(), String> {
    let (ok, rule) = match kind {
        Kind::Account => (
            is_account_number(name),
            "must be an account number like 3141-5926-5359",
        ),
        Kind::User => (
            USERNAME_RE.is_match(name),
            "must be lowercase letters, digits, '.', '_' or '-' (max 150)",
        ),
        _ => (
            is_dns_label(name),
            "must be lowercase alphanumeric with hyphens (max 63)",
        ),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("'{name}' {rule}"))
    }
}
