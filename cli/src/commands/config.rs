//! `smarter config`: inspect the merged configuration.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the configuration after file, environment and flag overrides
    Show,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or rendered.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let config = app.config()?;
            let path = app.config_store.path()?;
            app.renderer().render_config(&config, &path)
        }
    }
}
