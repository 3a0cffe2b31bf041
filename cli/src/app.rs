//! Application context: unified state passed to every command handler.
//!
//! `AppContext` carries the output mode, the config store and the global
//! flags that override configuration. Opening the database and resolving
//! the local caller happen here so every verb command does it the same way.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ports::{ConfigStore, ResourceStore};
use crate::application::services::KindRegistry;
use crate::application::services::identity::local_caller;
use crate::domain::{Caller, SmarterConfig};
use crate::infra::store::expand_home;
use crate::infra::{DeployRunner, HostProvisioner, InlineTaskQueue, SqliteStore, YamlConfigStore};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, YamlRenderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
    /// YAML output; `describe` results are valid `apply` input.
    Yaml,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Explicit `-o` choice.
    pub format: Option<OutputMode>,
    /// `--json` shorthand.
    pub json: bool,
}

/// Flags that override configuration and identity.
#[derive(Default)]
pub struct SessionFlags {
    /// `--database`: replaces `database.path`.
    pub database: Option<String>,
    /// `--account` for local verbs.
    pub account: Option<String>,
    /// `--user` for local verbs.
    pub user: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub session: SessionFlags,
}

/// Everything a local broker call needs.
pub struct Session {
    pub config: Arc<SmarterConfig>,
    pub store: Arc<SqliteStore>,
    pub registry: KindRegistry,
    pub tasks: InlineTaskQueue,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode.
    pub mode: OutputMode,
    /// Configuration file plus `SMARTER_*` overrides.
    pub config_store: YamlConfigStore,
    pub session: SessionFlags,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when the `CI` or `SMARTER_YES` environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let non_interactive = std::env::var("CI").is_ok() || std::env::var("SMARTER_YES").is_ok();
        let mode = match (flags.output.format, flags.output.json) {
            (Some(mode), _) => mode,
            (None, true) => OutputMode::Json,
            (None, false) => OutputMode::Human,
        };

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store: YamlConfigStore::new(),
            session: flags.session,
            non_interactive,
        }
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
            OutputMode::Yaml => Renderer::Yaml(YamlRenderer),
        }
    }

    /// Merged configuration: file, environment, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or a value is invalid.
    pub fn config(&self) -> Result<SmarterConfig> {
        let mut config = self.config_store.load()?;
        if let Some(path) = &self.session.database {
            config.database.path.clone_from(path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Open the database and build the broker registry.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the database cannot be opened.
    pub fn open_session(&self) -> Result<Session> {
        let config = Arc::new(self.config()?);
        let path = expand_home(&config.database.path)?;
        let store = Arc::new(
            SqliteStore::open(&path).with_context(|| format!("cannot open {}", path.display()))?,
        );
        let registry = KindRegistry::new().map_err(|e| anyhow::anyhow!(e))?;
        let tasks = InlineTaskQueue::new(DeployRunner {
            store: store.clone(),
            provisioner: Arc::new(HostProvisioner::new(config.platform.environment)),
            config: config.clone(),
        });
        Ok(Session {
            config,
            store,
            registry,
            tasks,
        })
    }

    /// The `(account, user)` local verbs run as.
    ///
    /// # Errors
    ///
    /// Returns an error if either flag is missing or the user cannot act.
    pub fn caller(&self, store: &dyn ResourceStore) -> Result<Caller> {
        let account = self
            .session
            .account
            .as_deref()
            .context("--account (or SMARTER_ACCOUNT) is required")?;
        let user = self
            .session
            .user
            .as_deref()
            .context("--user (or SMARTER_USER) is required")?;
        Ok(local_caller(store, account, user)?)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI or `SMARTER_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
