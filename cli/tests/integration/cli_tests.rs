//! Integration tests for the CLI surface: help, version, config, schemas.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

use crate::support::Sandbox;

fn smarter() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smarter"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version ---

#[test]
fn test_cli_no_args_shows_help() {
    smarter().assert().code(2).stderr(predicate::str::contains(
        "Declarative manifests for AI chatbot resources",
    ));
}

#[test]
fn test_cli_help_lists_verbs() {
    smarter()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("undeploy"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_cli_version_flag() {
    smarter()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smarter"));
}

#[test]
fn test_version_command() {
    smarter()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smarter v0.1.0"));
}

#[test]
fn test_no_color_env_accepts_any_value() {
    for value in ["1", "true", ""] {
        Command::new(assert_cmd::cargo::cargo_bin!("smarter"))
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("smarter v0.1.0"))
            .stdout(predicate::str::contains("\x1b[").not());
    }
}

#[test]
fn test_no_color_flag() {
    Command::new(assert_cmd::cargo::cargo_bin!("smarter"))
        .env_remove("NO_COLOR")
        .args(["--no-color", "version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_version_command_json() {
    let output = smarter()
        .args(["version", "--json"])
        .output()
        .expect("run version");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["version"], "0.1.0");
}

#[test]
fn test_unknown_command_fails() {
    smarter().arg("frobnicate").assert().failure();
}

// --- Config ---

#[test]
fn test_config_show_reports_database_flag() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .smarter()
        .args(["config", "show", "--json"])
        .output()
        .expect("run config show");
    assert!(output.status.success(), "{output:?}");
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["database"]["path"], sandbox.db_path().display().to_string());
    assert_eq!(v["platform"]["environment"], "local");
}

#[test]
fn test_config_show_env_override() {
    let sandbox = Sandbox::new();
    sandbox
        .smarter()
        .env("SMARTER_API_DOMAIN", "api.example.test")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api.example.test"));
}

#[test]
fn test_config_rejects_unknown_environment() {
    let sandbox = Sandbox::new();
    sandbox
        .smarter()
        .env("SMARTER_ENVIRONMENT", "staging")
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

// --- Schemas and examples need no database ---

#[test]
fn test_schema_prints_spec_schema() {
    smarter()
        .args(["schema", "chatbot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaultTemperature"));
}

#[test]
fn test_example_prints_manifest() {
    smarter()
        .args(["example", "SqlConnection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apiVersion: smarter.sh/v1"))
        .stdout(predicate::str::contains("kind: SqlConnection"));
}

#[test]
fn test_schema_unknown_kind() {
    smarter()
        .args(["schema", "widget"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown kind"));
}

#[test]
fn test_verbs_need_identity() {
    let sandbox = Sandbox::new();
    sandbox
        .smarter()
        .args(["get", "chatbots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--account"));
}

#[test]
fn test_unknown_account_points_at_bootstrap() {
    let sandbox = Sandbox::new();
    sandbox
        .admin()
        .args(["get", "chatbots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("smarter bootstrap"));
}
