//! Broker verbs run locally against the configured database.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use smarter_common::{BrokerResponse, Outcome, Verb};

use crate::app::{AppContext, OutputMode, Session};
use crate::application::services::{BrokerContext, KindRegistry};
use crate::domain::manifest::{ManifestFormat, load};

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest file (YAML or JSON); `-` reads stdin
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    /// Resource kind, e.g. chatbot or plugins
    pub kind: String,
    /// Resource name; omit to list every resource of the kind
    pub name: Option<String>,
}

#[derive(Args)]
pub struct NamedArgs {
    /// Resource kind
    pub kind: String,
    /// Resource name
    pub name: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Resource kind
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct KindArgs {
    /// Resource kind
    pub kind: String,
}

/// `smarter apply -f <file>`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the broker rejects it.
pub fn apply(app: &AppContext, args: &ApplyArgs) -> Result<()> {
    let (text, format) = read_manifest(&args.file)?;
    let raw = load(&text, format)?;
    let response = with_broker(app, |ctx, registry| Ok(registry.apply(ctx, &raw)?))?;
    app.renderer().render_response(&response)
}

/// `get`, `describe`, `deploy`, `undeploy`, `status` and `logs`.
///
/// # Errors
///
/// Returns an error if the broker rejects the call.
pub fn run(app: &AppContext, verb: Verb, kind: &str, name: Option<&str>) -> Result<()> {
    let (response, status) = with_broker(app, |ctx, registry| {
        let response = registry.run(ctx, verb, kind, name)?;
        // Local deploys settle inline; show where the record ended up.
        let status = match (response.outcome, name) {
            (Outcome::Deploying, Some(name)) => Some(registry.run(ctx, Verb::Status, kind, Some(name))?),
            _ => None,
        };
        Ok((response, status))
    })?;
    let renderer = app.renderer();
    renderer.render_response(&response)?;
    if let Some(status) = status.filter(|_| app.mode == OutputMode::Human) {
        renderer.render_response(&status)?;
    }
    Ok(())
}

/// `smarter delete <kind> <name>`.
///
/// # Errors
///
/// Returns an error if the broker refuses the delete.
pub fn delete(app: &AppContext, args: &DeleteArgs) -> Result<()> {
    if !args.yes && !app.confirm(&format!("Delete {} '{}'?", args.kind, args.name), false)? {
        app.output.info("Aborted.");
        return Ok(());
    }
    run(app, Verb::Delete, &args.kind, Some(&args.name))
}

/// `schema` and `example` need no database or identity.
///
/// # Errors
///
/// Returns an error if the kind is unknown.
pub fn describe_kind(app: &AppContext, verb: Verb, kind: &str) -> Result<()> {
    let registry = KindRegistry::new().map_err(|e| anyhow::anyhow!(e))?;
    let broker = registry.resolve(kind)?;
    let data = match verb {
        Verb::Schema => broker.schema(),
        _ => broker.example(),
    };
    app.renderer()
        .render_response(&BrokerResponse::new(broker.kind(), verb, Outcome::Ok, data))
}

fn with_broker<R>(
    app: &AppContext,
    f: impl FnOnce(&BrokerContext<'_>, &KindRegistry) -> Result<R>,
) -> Result<R> {
    let Session {
        config,
        store,
        registry,
        tasks,
    } = app.open_session()?;
    let caller = app.caller(store.as_ref())?;
    let ctx = BrokerContext {
        caller: &caller,
        store: store.as_ref(),
        tasks: &tasks,
        config: &config,
    };
    f(&ctx, &registry)
}

fn read_manifest(path: &Path) -> Result<(String, Option<ManifestFormat>)> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("cannot read manifest from stdin")?;
        return Ok((text, None));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok((text, ManifestFormat::from_path(path)))
}
