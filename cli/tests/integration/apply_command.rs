//! Integration tests for the broker verbs against a temp database.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::support::{ACCOUNT, Sandbox};

const SECRET_YAML: &str = "\
apiVersion: smarter.sh/v1
kind: Secret
metadata:
  name: openai-key
  description: OpenAI key
spec:
  value: sk-123
";

fn example(sandbox: &Sandbox, kind: &str) -> std::path::PathBuf {
    let output = sandbox
        .smarter()
        .args(["example", kind])
        .output()
        .expect("run example");
    assert!(output.status.success(), "{output:?}");
    let text = String::from_utf8(output.stdout).expect("utf-8");
    sandbox.file(&format!("{kind}.yaml"), &text)
}

#[test]
fn test_bootstrap_is_idempotent() {
    let sandbox = Sandbox::new();
    let token = sandbox.bootstrap();
    assert!(token.starts_with("smr_"));

    sandbox
        .smarter()
        .args(["--account", ACCOUNT, "bootstrap", "--admin", "mcdaniel"])
        .args(["--email", "mcdaniel@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Account {ACCOUNT} already exists")))
        .stdout(predicate::str::contains("its token is not shown again"));
}

#[test]
fn test_apply_create_then_unchanged() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let manifest = sandbox.file("secret.yaml", SECRET_YAML);

    sandbox
        .admin()
        .arg("apply")
        .arg("-f")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Secret 'openai-key' created"));

    sandbox
        .admin()
        .arg("apply")
        .arg("-f")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Secret 'openai-key' unchanged"));

    let edited = sandbox.file(
        "secret-edited.yaml",
        &SECRET_YAML.replace("description: OpenAI key", "description: Rotated key"),
    );
    sandbox
        .admin()
        .arg("apply")
        .arg("-f")
        .arg(&edited)
        .assert()
        .success()
        .stdout(predicate::str::contains("updated: description"));
}

#[test]
fn test_apply_from_stdin() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    sandbox
        .admin()
        .args(["apply", "-f", "-"])
        .write_stdin(SECRET_YAML)
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
}

#[test]
fn test_apply_missing_file_fails() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    sandbox
        .admin()
        .args(["apply", "-f", "does-not-exist.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_validation_error_as_json() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let bad = sandbox.file(
        "bad.yaml",
        &SECRET_YAML.replace("name: openai-key", "name: OpenAI_Key"),
    );
    let output = sandbox
        .admin()
        .arg("--json")
        .arg("apply")
        .arg("-f")
        .arg(&bad)
        .output()
        .expect("run apply");
    assert_eq!(output.status.code(), Some(1));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON error body");
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "ManifestValidationError");
    assert_eq!(body["fields"][0]["path"], "metadata.name");
}

#[test]
fn test_validation_error_lists_fields_on_stderr() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let bad = sandbox.file(
        "bad.yaml",
        &SECRET_YAML.replace("value: sk-123", "value: sk-123\n  colour: blue"),
    );
    sandbox
        .admin()
        .arg("apply")
        .arg("-f")
        .arg(&bad)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Secret manifest is invalid"))
        .stderr(predicate::str::contains("spec"));
}

#[test]
fn test_describe_output_reapplies_unchanged() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let manifest = sandbox.file("secret.yaml", SECRET_YAML);
    sandbox.admin().arg("apply").arg("-f").arg(&manifest).assert().success();

    let output = sandbox
        .admin()
        .args(["describe", "secret", "openai-key"])
        .output()
        .expect("run describe");
    assert!(output.status.success(), "{output:?}");
    let described = String::from_utf8(output.stdout).expect("utf-8");
    assert!(described.contains("kind: Secret"));
    assert!(!described.contains("sk-123"));

    let round_trip = sandbox.file("described.yaml", &described);
    sandbox
        .admin()
        .arg("apply")
        .arg("-f")
        .arg(&round_trip)
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));
}

#[test]
fn test_get_delete_then_not_found() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let manifest = sandbox.file("secret.yaml", SECRET_YAML);
    sandbox.admin().arg("apply").arg("-f").arg(&manifest).assert().success();

    sandbox
        .admin()
        .args(["get", "secrets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("openai-key"));

    sandbox
        .admin()
        .args(["delete", "secret", "openai-key", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Secret 'openai-key' deleted"));

    sandbox
        .admin()
        .args(["describe", "secret", "openai-key"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Secret 'openai-key' not found"));

    sandbox
        .admin()
        .args(["get", "secrets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Secret resources found."));
}

#[test]
fn test_deploy_chatbot_end_to_end() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    for kind in ["Secret", "SqlConnection", "Plugin", "ChatBot"] {
        let manifest = example(&sandbox, kind);
        sandbox
            .admin()
            .arg("apply")
            .arg("-f")
            .arg(&manifest)
            .assert()
            .success()
            .stdout(predicate::str::contains("created"));
    }

    sandbox
        .admin()
        .args(["deploy", "chatbot", "stackademy-sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ChatBot 'stackademy-sql' deploying"))
        .stdout(predicate::str::contains("deployed"))
        .stdout(predicate::str::contains(format!(
            "http://stackademy-sql.{ACCOUNT}.local.api.smarter.sh/"
        )));

    let output = sandbox
        .admin()
        .args(["-o", "json", "logs", "chatbot", "stackademy-sql"])
        .output()
        .expect("run logs");
    assert!(output.status.success(), "{output:?}");
    let logs: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
    let events: Vec<&str> = logs["data"]
        .as_array()
        .expect("event list")
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(events, vec!["created", "deploy_requested", "deployed"]);

    sandbox
        .admin()
        .args(["undeploy", "chatbot", "stackademy-sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("undeployed"));
}

#[test]
fn test_deploy_secret_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.bootstrap();
    let manifest = sandbox.file("secret.yaml", SECRET_YAML);
    sandbox.admin().arg("apply").arg("-f").arg(&manifest).assert().success();
    sandbox
        .admin()
        .args(["deploy", "secret", "openai-key"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no deployment lifecycle"));
}
