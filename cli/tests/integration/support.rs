//! A throwaway home for one test: database file and config path.

#![allow(clippy::expect_used, dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

pub const ACCOUNT: &str = "3141-5926-5359";
pub const ADMIN: &str = "mcdaniel";

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("smarter.db")
    }

    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write test file");
        path
    }

    /// `smarter` with no identity flags.
    pub fn smarter(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smarter"));
        cmd.env("NO_COLOR", "1")
            .env("SMARTER_CONFIG", self.dir.path().join("config.yaml"))
            .env_remove("SMARTER_ACCOUNT")
            .env_remove("SMARTER_USER")
            .env_remove("SMARTER_DATABASE_PATH")
            .env_remove("SMARTER_ENVIRONMENT")
            .arg("--database")
            .arg(self.db_path());
        cmd
    }

    /// `smarter` acting as the bootstrap admin.
    pub fn admin(&self) -> Command {
        let mut cmd = self.smarter();
        cmd.args(["--account", ACCOUNT, "--user", ADMIN]);
        cmd
    }

    /// Create the account; returns the bootstrap token.
    pub fn bootstrap(&self) -> String {
        let output = self
            .smarter()
            .args(["--account", ACCOUNT, "--json", "bootstrap", "--admin", ADMIN])
            .args(["--email", "mcdaniel@example.com"])
            .output()
            .expect("run bootstrap");
        assert!(output.status.success(), "bootstrap failed: {output:?}");
        let report: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("bootstrap prints JSON");
        report["token"].as_str().expect("token").to_string()
    }
}
