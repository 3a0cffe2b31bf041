//! Output formatting module

pub mod human;
pub mod json;
pub mod styles;
pub mod yaml;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
use smarter_common::BrokerResponse;

use crate::application::services::identity::BootstrapReport;
use crate::domain::SmarterConfig;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;
pub use yaml::YamlRenderer;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer for the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
    Yaml(YamlRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if the response cannot be serialized.
    pub fn render_response(&self, response: &BrokerResponse) -> Result<()> {
        match self {
            Renderer::Human(r) => r.render_response(response),
            Renderer::Json(r) => r.render(response),
            Renderer::Yaml(r) => r.render(response),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn render_bootstrap(&self, report: &BootstrapReport) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_bootstrap(report);
                Ok(())
            }
            Renderer::Json(r) => r.render(report),
            Renderer::Yaml(r) => r.render(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized.
    pub fn render_config(&self, config: &SmarterConfig, path: &Path) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_config(config, path);
                Ok(())
            }
            Renderer::Json(r) => r.render(config),
            Renderer::Yaml(r) => r.render(config),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the version object cannot be serialized.
    pub fn render_version(&self, version: &str) -> Result<()> {
        let info = serde_json::json!({ "version": version });
        match self {
            Renderer::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Renderer::Json(r) => r.render(&info),
            Renderer::Yaml(r) => r.render(&info),
        }
    }
}
