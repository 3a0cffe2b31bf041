//! `smarter serve`: run the HTTP API with a background deploy worker.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::api::{AppState, router};
use crate::app::AppContext;
use crate::application::services::KindRegistry;
use crate::application::services::provisioning::requeue_interrupted;
use crate::infra::store::expand_home;
use crate::infra::{ChannelTaskQueue, DeployRunner, HostProvisioner, SqliteStore};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind; overrides `server.listenAddr`
    #[arg(long)]
    pub listen: Option<String>,
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database cannot be
/// opened, or the listener cannot bind.
pub async fn run(app: &AppContext, args: &ServeArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = app.config()?;
    if let Some(listen) = &args.listen {
        config.server.listen_addr.clone_from(listen);
        config.validate()?;
    }
    let config = Arc::new(config);
    tracing::info!(
        listen_addr = %config.server.listen_addr,
        database = %config.database.path,
        environment = %config.platform.environment,
        api_domain = %config.platform.api_domain,
        "configuration loaded",
    );

    let path = expand_home(&config.database.path)?;
    let store = Arc::new(
        SqliteStore::open(&path).with_context(|| format!("cannot open {}", path.display()))?,
    );
    let registry = Arc::new(KindRegistry::new().map_err(|e| anyhow::anyhow!(e))?);

    let (tasks, worker) = ChannelTaskQueue::spawn(DeployRunner {
        store: store.clone(),
        provisioner: Arc::new(HostProvisioner::new(config.platform.environment)),
        config: config.clone(),
    });

    let requeued = requeue_interrupted(store.as_ref(), &tasks)
        .context("cannot re-queue interrupted deploys")?;
    if requeued > 0 {
        tracing::info!(requeued, "resumed deploys left by a previous run");
    }

    let app_router = router(AppState {
        registry,
        store,
        tasks: Arc::new(tasks),
        config: config.clone(),
    });

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    tracing::info!("smarter API ready at http://{addr}/api/v1/");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // The router (and its queue handle) is gone; let queued deploys finish.
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "deploy worker ended abnormally");
    }
    tracing::info!("smarter shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("received shutdown signal");
}
