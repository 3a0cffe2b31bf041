//! Account isolation and role checks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use smarter_cli::domain::Caller;
use smarter_common::{Kind, Outcome, Verb};

use crate::helpers::{ACCOUNT, ADMIN, Fixture, OTHER_ACCOUNT};

fn user_manifest(name: &str, is_admin: bool) -> Value {
    json!({
        "apiVersion": "smarter.sh/v1",
        "kind": "User",
        "metadata": {"name": name, "description": "team member"},
        "spec": {"email": format!("{name}@example.com"), "isAdmin": is_admin},
    })
}

#[test]
fn test_accounts_do_not_see_each_other() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_stackademy(&admin);

    fx.bootstrap(OTHER_ACCOUNT, "ada");
    let other = Caller::new(OTHER_ACCOUNT, "ada", true);

    let err = fx
        .run(&other, Verb::Describe, "chatbot", Some("stackademy-sql"))
        .unwrap_err();
    assert_eq!(err.code(), "NotFoundError");
    let listed = fx.run(&other, Verb::Get, "chatbot", None).unwrap();
    assert_eq!(listed.data, json!([]));

    // Same name in another account is a different record.
    let resp = fx.apply_value(&other, &fx.example(Kind::Secret)).unwrap();
    assert_eq!(resp.outcome, Outcome::Created);

    fx.run(&other, Verb::Delete, "secret", Some("stackademy-db-password"))
        .unwrap();
    fx.run(&admin, Verb::Describe, "secret", Some("stackademy-db-password"))
        .expect("delete in one account leaves the other intact");
}

#[test]
fn test_references_resolve_inside_the_callers_account() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(&admin, &fx.example(Kind::Secret)).unwrap();

    fx.bootstrap(OTHER_ACCOUNT, "ada");
    let other = Caller::new(OTHER_ACCOUNT, "ada", true);
    let err = fx
        .apply_value(&other, &fx.example(Kind::SqlConnection))
        .unwrap_err();
    assert_eq!(err.code(), "ManifestValidationError");
    assert_eq!(err.fields()[0].path, "spec.password");
}

#[test]
fn test_account_manifest_targets_only_own_account() {
    let fx = Fixture::new();
    let admin = fx.admin();
    let mut account = fx.example(Kind::Account);
    account["metadata"]["name"] = json!(ACCOUNT);
    assert_eq!(fx.apply_value(&admin, &account).unwrap().outcome, Outcome::Updated);

    account["metadata"]["name"] = json!(OTHER_ACCOUNT);
    let err = fx.apply_value(&admin, &account).unwrap_err();
    assert_eq!(err.code(), "PermissionError");

    let err = fx.run(&admin, Verb::Delete, "account", Some(ACCOUNT)).unwrap_err();
    assert_eq!(err.code(), "PermissionError");
}

#[test]
fn test_identity_kinds_are_admin_only() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(&admin, &user_manifest("viewer", false)).unwrap();
    let viewer = Caller::new(ACCOUNT, "viewer", false);

    let err = fx
        .apply_value(&viewer, &user_manifest("intruder", true))
        .unwrap_err();
    assert_eq!(err.code(), "PermissionError");
    assert_eq!(err.http_status(), 403);

    // Content kinds are open to every member.
    let resp = fx.apply_value(&viewer, &fx.example(Kind::Secret)).unwrap();
    assert_eq!(resp.outcome, Outcome::Created);
}

#[test]
fn test_users_cannot_delete_themselves() {
    let fx = Fixture::new();
    let admin = fx.admin();
    let err = fx.run(&admin, Verb::Delete, "user", Some(ADMIN)).unwrap_err();
    assert_eq!(err.code(), "PermissionError");
}

#[test]
fn test_user_with_api_key_cannot_be_deleted() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(&admin, &user_manifest("ci-bot", false)).unwrap();
    fx.apply_value(
        &admin,
        &json!({
            "apiVersion": "smarter.sh/v1",
            "kind": "ApiKey",
            "metadata": {"name": "ci-bot-key", "description": "CI"},
            "spec": {"user": "ci-bot"},
        }),
    )
    .unwrap();

    let err = fx.run(&admin, Verb::Delete, "user", Some("ci-bot")).unwrap_err();
    assert_eq!(err.code(), "PreconditionError");

    fx.run(&admin, Verb::Delete, "apikey", Some("ci-bot-key")).unwrap();
    let resp = fx.run(&admin, Verb::Delete, "user", Some("ci-bot")).unwrap();
    assert_eq!(resp.outcome, Outcome::Deleted);
}

#[test]
fn test_custom_domain_is_claimed_by_one_account() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.bootstrap(OTHER_ACCOUNT, "ada");
    let other = Caller::new(OTHER_ACCOUNT, "ada", true);

    let mut chatbot = fx.example(Kind::ChatBot);
    chatbot["spec"]["config"]["customDomain"] = json!("chat.stackademy.com");
    fx.apply_value(&other, &chatbot).unwrap();

    chatbot["spec"]["config"]["customDomain"] = json!("Chat.Stackademy.com");
    let err = fx.apply_value(&admin, &chatbot).unwrap_err();
    assert_eq!(err.code(), "ManifestValidationError");
    assert_eq!(crate::helpers::invalid_paths(&err), vec!["spec.config.customDomain"]);
    fx.run(&admin, Verb::Describe, "chatbot", Some("stackademy-sql"))
        .expect_err("rejected apply writes nothing");

    // The owner re-applying its own domain is an update, not a clash.
    let resp = fx.apply_value(&other, &chatbot).unwrap();
    assert_eq!(resp.outcome, Outcome::Updated);

    fx.run(&other, Verb::Delete, "chatbot", Some("stackademy-sql"))
        .unwrap();
    let resp = fx.apply_value(&admin, &chatbot).unwrap();
    assert_eq!(resp.outcome, Outcome::Created);
}
