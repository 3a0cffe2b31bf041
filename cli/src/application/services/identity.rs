//! Application service: callers and bootstrap.
//!
//! Resolves API tokens and local `--account/--user` flags to a `Caller`,
//! and bootstraps a new account with its first admin and API key through
//! the ordinary brokers.

use serde::Serialize;
use serde_json::{Value, json};
use smarter_common::{API_VERSION, Kind, Outcome};

use crate::application::ports::ResourceStore;
use crate::application::services::broker::BrokerContext;
use crate::application::services::registry::KindRegistry;
use crate::domain::credential::digest;
use crate::domain::manifest::{ManifestFormat, load};
use crate::domain::names::{is_account_number, is_dns_label};
use crate::domain::{BrokerError, Caller, ResourceKey, ResourceRecord};

/// Scheme of the `Authorization` header.
pub const AUTH_SCHEME: &str = "Token";

/// What `bootstrap` created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub account: String,
    pub username: String,
    pub api_key: String,
    /// Present only when the key was created by this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub account_created: bool,
}

/// Create an account, its admin user and an API key for that user.
///
/// Re-running for an existing account updates the records and issues no
/// new token.
///
/// # Errors
///
/// Validation errors from the User/ApiKey brokers, or store failures.
pub fn bootstrap(
    registry: &KindRegistry,
    ctx: &BrokerContext<'_>,
    company_name: &str,
    email: &str,
) -> Result<BootstrapReport, BrokerError> {
    let account = &ctx.caller.account;
    let username = &ctx.caller.username;
    if !is_account_number(account) {
        return Err(BrokerError::BadRequest(format!(
            "'{account}' is not an account number like 3141-5926-5359"
        )));
    }
    let account_created = ctx.store.create_account(account, company_name)?;

    let api_key = api_key_name(username);
    let manifests = [
        manifest(Kind::Account, account, "Account", json!({ "companyName": company_name })),
        manifest(
            Kind::User,
            username,
            "Account administrator",
            json!({ "email": email, "isAdmin": true }),
        ),
        manifest(
            Kind::ApiKey,
            &api_key,
            "Bootstrap API key",
            json!({ "user": username }),
        ),
    ];

    let mut token = None;
    for document in manifests {
        let raw = load(&document.to_string(), Some(ManifestFormat::Json))?;
        let response = registry.apply(ctx, &raw)?;
        if response.kind == Kind::ApiKey && response.outcome == Outcome::Created {
            token = response
                .data
                .pointer("/status/token")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }

    tracing::info!(%account, %username, account_created, "bootstrap");
    Ok(BootstrapReport {
        account: account.clone(),
        username: username.clone(),
        api_key,
        token,
        account_created,
    })
}

fn manifest(kind: Kind, name: &str, description: &str, spec: Value) -> Value {
    json!({
        "apiVersion": API_VERSION,
        "kind": kind,
        "metadata": { "name": name, "description": description },
        "spec": spec,
    })
}

/// DNS-label key name derived from a username (`jane.doe` → `jane-doe-key`).
fn api_key_name(username: &str) -> String {
    let base: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = base.trim_matches('-');
    let base: String = base.chars().take(59).collect();
    let name = format!("{}-key", base.trim_end_matches('-'));
    if is_dns_label(&name) { name } else { "admin-key".to_string() }
}

/// Resolve an `Authorization: Token <key>` header value.
///
/// # Errors
///
/// `Unauthenticated` for a missing, malformed, unknown or inactive key, or
/// an inactive owner.
pub fn authenticate(store: &dyn ResourceStore, header: Option<&str>) -> Result<Caller, BrokerError> {
    let header = header.ok_or_else(|| unauthenticated("missing Authorization header"))?;
    let token = header
        .strip_prefix(AUTH_SCHEME)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unauthenticated("expected 'Authorization: Token <key>'"))?;

    let key = store
        .find_credential(&digest(token))?
        .ok_or_else(|| unauthenticated("unknown API key"))?;
    let api_key = store
        .find(&key)?
        .ok_or_else(|| unauthenticated("unknown API key"))?;
    if !flag(&api_key, "isActive", true) {
        return Err(unauthenticated("API key is inactive"));
    }
    let username = api_key
        .spec
        .get("user")
        .and_then(Value::as_str)
        .ok_or_else(|| BrokerError::Internal(format!("API key {key} has no user")))?;
    active_caller(store, &key.account, username)
}

/// Caller for local CLI verbs.
///
/// # Errors
///
/// `Unauthenticated` when the account or user does not exist or the user
/// is inactive.
pub fn local_caller(store: &dyn ResourceStore, account: &str, username: &str) -> Result<Caller, BrokerError> {
    if !store.account_exists(account)? {
        return Err(unauthenticated(&format!(
            "account '{account}' does not exist; run 'smarter bootstrap' first"
        )));
    }
    active_caller(store, account, username)
}

fn active_caller(store: &dyn ResourceStore, account: &str, username: &str) -> Result<Caller, BrokerError> {
    let user = store
        .find(&ResourceKey::new(account, Kind::User, username))?
        .ok_or_else(|| unauthenticated(&format!("user '{username}' does not exist")))?;
    if !flag(&user, "isActive", true) {
        return Err(unauthenticated(&format!("user '{username}' is inactive")));
    }
    Ok(Caller::new(account, username, flag(&user, "isAdmin", false)))
}

fn flag(record: &ResourceRecord, field: &str, default: bool) -> bool {
    record.spec.get(field).and_then(Value::as_bool).unwrap_or(default)
}

fn unauthenticated(message: &str) -> BrokerError {
    BrokerError::Unauthenticated(message.to_string())
}
