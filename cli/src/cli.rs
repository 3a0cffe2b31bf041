//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};
use smarter_common::Verb;

use crate::app::{AppContext, AppFlags, OutputFlags, OutputMode, SessionFlags};
use crate::commands;

/// Declarative manifests for AI chatbot resources
#[derive(Parser)]
#[command(
    name = "smarter",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format (same as `-o json`)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format
    #[arg(short = 'o', long = "output-format", global = true, value_enum)]
    pub output_format: Option<OutputMode>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (`NO_COLOR` is honored as well)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// SQLite database file; overrides `database.path`
    #[arg(long, global = true, env = "SMARTER_DATABASE_PATH")]
    pub database: Option<String>,

    /// Account local verbs act in
    #[arg(long, global = true, env = "SMARTER_ACCOUNT")]
    pub account: Option<String>,

    /// User local verbs act as
    #[arg(long, global = true, env = "SMARTER_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(commands::serve::ServeArgs),

    /// Create an account with an admin user and API key
    Bootstrap(commands::bootstrap::BootstrapArgs),

    /// Create or update a resource from a manifest
    Apply(commands::verbs::ApplyArgs),

    /// List resources of a kind, or show one
    Get(commands::verbs::GetArgs),

    /// Print a resource as a manifest
    Describe(commands::verbs::NamedArgs),

    /// Permanently delete a resource
    Delete(commands::verbs::DeleteArgs),

    /// Deploy a ChatBot or Plugin
    Deploy(commands::verbs::NamedArgs),

    /// Take a ChatBot or Plugin offline
    Undeploy(commands::verbs::NamedArgs),

    /// Show deployment status
    Status(commands::verbs::NamedArgs),

    /// Show a resource's event journal
    Logs(commands::verbs::NamedArgs),

    /// Print the JSON Schema of a kind's spec
    Schema(commands::verbs::KindArgs),

    /// Print an example manifest for a kind
    Example(commands::verbs::KindArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Whether errors should be printed as JSON objects.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        match self.output_format {
            Some(mode) => mode == OutputMode::Json,
            None => self.json,
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            output_format,
            quiet,
            no_color,
            database,
            account,
            user,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                format: output_format,
                json,
            },
            session: SessionFlags {
                database,
                account,
                user,
            },
        });

        match command {
            Command::Serve(args) => commands::serve::run(&app, &args).await,
            Command::Bootstrap(args) => commands::bootstrap::run(&app, &args),
            Command::Apply(args) => commands::verbs::apply(&app, &args),
            Command::Get(args) => commands::verbs::run(&app, Verb::Get, &args.kind, args.name.as_deref()),
            Command::Describe(args) => named(&app, Verb::Describe, &args),
            Command::Delete(args) => commands::verbs::delete(&app, &args),
            Command::Deploy(args) => named(&app, Verb::Deploy, &args),
            Command::Undeploy(args) => named(&app, Verb::Undeploy, &args),
            Command::Status(args) => named(&app, Verb::Status, &args),
            Command::Logs(args) => named(&app, Verb::Logs, &args),
            Command::Schema(args) => commands::verbs::describe_kind(&app, Verb::Schema, &args.kind),
            Command::Example(args) => commands::verbs::describe_kind(&app, Verb::Example, &args.kind),
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}

fn named(app: &AppContext, verb: Verb, args: &commands::verbs::NamedArgs) -> Result<()> {
    commands::verbs::run(app, verb, &args.kind, Some(&args.name))
}
