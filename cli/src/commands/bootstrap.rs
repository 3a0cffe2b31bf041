//! `smarter bootstrap`: create an account with its first admin and API key.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::BrokerContext;
use crate::application::services::identity::bootstrap;
use crate::domain::Caller;

#[derive(Args)]
pub struct BootstrapArgs {
    /// Username of the account administrator
    #[arg(long)]
    pub admin: String,

    /// Administrator email address
    #[arg(long)]
    pub email: String,

    /// Company name recorded on the account (defaults to the account number)
    #[arg(long)]
    pub company: Option<String>,
}

/// Run the bootstrap command for the global `--account`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or any manifest fails.
pub fn run(app: &AppContext, args: &BootstrapArgs) -> Result<()> {
    let account = app
        .session
        .account
        .clone()
        .context("--account (or SMARTER_ACCOUNT) is required")?;
    let session = app.open_session()?;
    let caller = Caller::new(account, args.admin.clone(), true);
    let ctx = BrokerContext {
        caller: &caller,
        store: session.store.as_ref(),
        tasks: &session.tasks,
        config: &session.config,
    };
    let company = args.company.as_deref().unwrap_or(&caller.account);
    let report = bootstrap(&session.registry, &ctx, company, &args.email)?;
    app.renderer().render_bootstrap(&report)
}
