//! `TaskQueue` adapters: a tokio background worker for `serve`, and an
//! inline queue for one-shot CLI verbs.

use std::sync::Arc;
use std::time::Duration;

use smarter_common::DeployState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::ports::{DeployTask, Provisioner, ResourceStore, TaskQueue};
use crate::application::services::provisioning::run_deploy;
use crate::domain::{EventKind, SmarterConfig};

/// Shared dependencies of a deploy run.
#[derive(Clone)]
pub struct DeployRunner {
    pub store: Arc<dyn ResourceStore>,
    pub provisioner: Arc<dyn Provisioner>,
    pub config: Arc<SmarterConfig>,
}

impl DeployRunner {
    fn run(&self, task: &DeployTask, pause: &dyn Fn(Duration)) {
        match run_deploy(
            self.store.as_ref(),
            self.provisioner.as_ref(),
            &self.config,
            task,
            pause,
        ) {
            Ok(Some(state)) => tracing::info!(key = %task.key, %state, "deploy settled"),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(key = %task.key, error = %e, "deploy worker store failure");
                self.abandon(task, &e.to_string());
            }
        }
    }

    /// Settle a task the worker could not finish as `failed`.
    fn abandon(&self, task: &DeployTask, reason: &str) {
        let moved = self.store.transition(
            &task.key,
            &[DeployState::Deploying],
            DeployState::Failed,
            EventKind::DeployFailed,
            &format!("deploy aborted: {reason}"),
        );
        if let Err(e) = moved {
            tracing::error!(key = %task.key, error = %e, "cannot mark deploy failed");
        }
    }
}

/// Background worker fed through an unbounded channel.
///
/// Tasks run one at a time on the blocking pool; dropping every queue
/// handle ends the worker once the backlog drains.
#[derive(Clone)]
pub struct ChannelTaskQueue {
    tx: mpsc::UnboundedSender<DeployTask>,
}

impl ChannelTaskQueue {
    /// Start the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(runner: DeployRunner) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DeployTask>();
        let handle = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let runner = runner.clone();
                let key = task.key.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    runner.run(&task, &std::thread::sleep);
                })
                .await;
                if let Err(e) = joined {
                    tracing::error!(%key, error = %e, "deploy task panicked");
                }
            }
            tracing::info!("deploy worker stopped");
        });
        (Self { tx }, handle)
    }
}

impl TaskQueue for ChannelTaskQueue {
    fn enqueue(&self, task: DeployTask) -> Result<(), String> {
        self.tx
            .send(task)
            .map_err(|_| "deploy worker is not running".to_string())
    }
}

/// Runs each task to completion inside `enqueue`.
pub struct InlineTaskQueue {
    runner: DeployRunner,
}

impl InlineTaskQueue {
    #[must_use]
    pub fn new(runner: DeployRunner) -> Self {
        Self { runner }
    }
}

impl TaskQueue for InlineTaskQueue {
    fn enqueue(&self, task: DeployTask) -> Result<(), String> {
        self.runner.run(&task, &std::thread::sleep);
        Ok(())
    }
}
