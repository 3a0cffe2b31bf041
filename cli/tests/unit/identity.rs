//! Bootstrap, API-key authentication and local callers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use smarter_cli::application::services::identity::{authenticate, bootstrap, local_caller};
use smarter_cli::domain::Caller;

use crate::helpers::{ACCOUNT, ADMIN, Fixture};

#[test]
fn test_bootstrap_token_authenticates_as_admin() {
    let fx = Fixture::new();
    let caller = authenticate(fx.store.as_ref(), Some(&format!("Token {}", fx.token))).unwrap();
    assert_eq!(caller, Caller::new(ACCOUNT, ADMIN, true));
}

#[test]
fn test_rerunning_bootstrap_issues_no_new_token() {
    let fx = Fixture::new();
    let report = fx.bootstrap(ACCOUNT, ADMIN);
    assert!(!report.account_created);
    assert!(report.token.is_none());
    assert_eq!(report.api_key, "mcdaniel-key");
    assert!(authenticate(fx.store.as_ref(), Some(&format!("Token {}", fx.token))).is_ok());
}

#[test]
fn test_bootstrap_rejects_malformed_account_number() {
    let fx = Fixture::new();
    let caller = Caller::new("acme", "root", true);
    let err = bootstrap(&fx.registry, &fx.ctx(&caller), "Acme", "root@example.com").unwrap_err();
    assert_eq!(err.code(), "BadRequestError");
}

#[test]
fn test_authenticate_rejects_bad_headers() {
    let fx = Fixture::new();
    for header in [
        None,
        Some("Bearer abc".to_string()),
        Some("Token ".to_string()),
        Some("Token smr_not-a-real-key".to_string()),
    ] {
        let err = authenticate(fx.store.as_ref(), header.as_deref()).unwrap_err();
        assert_eq!(err.code(), "UnauthenticatedError", "{header:?}");
        assert_eq!(err.http_status(), 401);
    }
}

#[test]
fn test_inactive_key_is_refused() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(
        &admin,
        &json!({
            "apiVersion": "smarter.sh/v1",
            "kind": "ApiKey",
            "metadata": {"name": "mcdaniel-key", "description": "Bootstrap API key"},
            "spec": {"user": ADMIN, "isActive": false},
        }),
    )
    .unwrap();
    let err = authenticate(fx.store.as_ref(), Some(&format!("Token {}", fx.token))).unwrap_err();
    assert!(err.to_string().contains("inactive"));
}

#[test]
fn test_local_caller_needs_an_active_user() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(
        &admin,
        &json!({
            "apiVersion": "smarter.sh/v1",
            "kind": "User",
            "metadata": {"name": "former", "description": "left the team"},
            "spec": {"email": "former@example.com", "isActive": false},
        }),
    )
    .unwrap();

    let err = local_caller(fx.store.as_ref(), ACCOUNT, "former").unwrap_err();
    assert_eq!(err.code(), "UnauthenticatedError");
    let err = local_caller(fx.store.as_ref(), ACCOUNT, "nobody").unwrap_err();
    assert!(err.to_string().contains("'nobody' does not exist"));
    let err = local_caller(fx.store.as_ref(), "9999-9999-9999", ADMIN).unwrap_err();
    assert!(err.to_string().contains("smarter bootstrap"));

    let caller = local_caller(fx.store.as_ref(), ACCOUNT, ADMIN).unwrap();
    assert!(caller.is_admin);
}
