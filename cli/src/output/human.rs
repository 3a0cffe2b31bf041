//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;
use serde_json::Value;
use smarter_common::{BrokerResponse, DeployState, Outcome, Verb};

use crate::application::services::identity::BootstrapReport;
use crate::domain::SmarterConfig;
use crate::output::OutputContext;
use crate::output::yaml::to_yaml;

/// Renders broker results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("smarter v{version}"));
    }

    /// Render any verb's result.
    ///
    /// # Errors
    ///
    /// Returns an error if a manifest-shaped result cannot be encoded as YAML.
    pub fn render_response(&self, response: &BrokerResponse) -> anyhow::Result<()> {
        match response.verb {
            Verb::Apply => self.render_apply(response),
            Verb::Get => self.render_get(response),
            Verb::Status => self.render_status(&response.data),
            Verb::Logs => self.render_logs(&response.data),
            Verb::Describe | Verb::Schema | Verb::Example => {
                print!("{}", to_yaml(&response.data)?);
            }
            Verb::Delete | Verb::Deploy | Verb::Undeploy => {
                self.ctx.success(&outcome_line(response));
            }
        }
        Ok(())
    }

    fn render_apply(&self, response: &BrokerResponse) {
        self.ctx.success(&outcome_line(response));
        if let Some(token) = response.data.pointer("/status/token").and_then(Value::as_str) {
            self.ctx.warn("Store this API key now; it will not be shown again:");
            println!("    {}", token.style(self.ctx.styles.bold));
        }
    }

    fn render_get(&self, response: &BrokerResponse) {
        let rows: Vec<&Value> = match &response.data {
            Value::Array(rows) => rows.iter().collect(),
            row => vec![row],
        };
        if rows.is_empty() {
            if !self.ctx.quiet {
                println!("No {} resources found.", response.kind);
            }
            return;
        }
        println!(
            "  {}",
            format!("{:<32} {:<14} {:<10} {}", "NAME", "STATE", "VARIANT", "UPDATED")
                .style(self.ctx.styles.header)
        );
        for row in rows {
            let state = row
                .get("deployState")
                .and_then(|v| serde_json::from_value::<DeployState>(v.clone()).ok())
                .unwrap_or_default();
            println!(
                "  {:<32} {:<14} {:<10} {}",
                text(row, "name"),
                format!("{:<14}", state.as_str()).style(self.ctx.styles.deploy_state(state)),
                text(row, "variant"),
                text(row, "updatedAt"),
            );
        }
    }

    fn render_status(&self, data: &Value) {
        for key in ["name", "kind", "deployState", "deployMessage", "url", "updatedAt"] {
            if let Some(value) = data.get(key) {
                self.ctx.kv(&format!("{key}:"), &plain(value));
            }
        }
    }

    fn render_logs(&self, data: &Value) {
        let Some(events) = data.as_array().filter(|e| !e.is_empty()) else {
            self.ctx.info("No events recorded.");
            return;
        };
        for event in events {
            println!(
                "  {}  {:<18} {}",
                text(event, "at").style(self.ctx.styles.dim),
                text(event, "event"),
                text(event, "message"),
            );
        }
    }

    /// Render the result of `smarter bootstrap`.
    pub fn render_bootstrap(&self, report: &BootstrapReport) {
        if report.account_created {
            self.ctx.success(&format!("Account {} created", report.account));
        } else {
            self.ctx.info(&format!("Account {} already exists", report.account));
        }
        self.ctx.success(&format!("Admin user '{}' ready", report.username));
        match &report.token {
            Some(token) => {
                self.ctx
                    .success(&format!("API key '{}' created", report.api_key));
                self.ctx.warn("Store this API key now; it will not be shown again:");
                println!("    {}", token.style(self.ctx.styles.bold));
            }
            None => self.ctx.info(&format!(
                "API key '{}' already exists; its token is not shown again",
                report.api_key
            )),
        }
    }

    /// Render the merged configuration.
    pub fn render_config(&self, config: &SmarterConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let rows = [
            ("server.listenAddr:", config.server.listen_addr.clone()),
            ("database.path:", config.database.path.clone()),
            ("platform.environment:", config.platform.environment.to_string()),
            ("platform.apiDomain:", config.platform.api_domain.clone()),
            ("broker.applyMaxRetries:", config.broker.apply_max_retries.to_string()),
            ("broker.deployMaxAttempts:", config.broker.deploy_max_attempts.to_string()),
            ("broker.deployBackoffMs:", config.broker.deploy_backoff_ms.to_string()),
            ("broker.deployTimeoutSecs:", config.broker.deploy_timeout_secs.to_string()),
        ];
        for (key, value) in rows {
            println!("  {key:<27} {value}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["SMARTER_CONFIG", "SMARTER_ACCOUNT", "SMARTER_USER", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }
}

/// One-line summary of a mutating verb.
#[must_use]
pub fn outcome_line(response: &BrokerResponse) -> String {
    let name = response
        .data
        .pointer("/metadata/name")
        .or_else(|| response.data.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    let subject = format!("{} '{name}'", response.kind);
    match response.outcome {
        Outcome::Created => format!("{subject} created"),
        Outcome::Updated => match response.changed.as_deref() {
            Some([]) | None => format!("{subject} unchanged"),
            Some(changed) => format!("{subject} updated: {}", changed.join(", ")),
        },
        Outcome::Deleted => format!("{subject} deleted"),
        Outcome::Deploying => format!("{subject} deploying"),
        Outcome::Undeployed => format!("{subject} undeployed"),
        Outcome::Ok => format!("{subject} ok"),
    }
}

fn text(row: &Value, key: &str) -> String {
    row.get(key).map(plain).unwrap_or_default()
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
