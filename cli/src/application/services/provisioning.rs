//! Application service: deploy provisioning.
//!
//! Runs one `DeployTask`: calls the `Provisioner` with bounded retries and
//! linear backoff, then settles the record in `deployed` or `failed`.
//! Cancellation is not supported; `undeploy` waits for the task to settle,
//! or takes over once the record has stalled.

use std::time::Duration;

use smarter_common::DeployState;

use crate::application::ports::{
    DeployTask, ProvisionTarget, Provisioner, ResourceStore, TaskQueue, Transition,
};
use crate::domain::routing::record_hosts;
use crate::domain::{EventKind, SmarterConfig, StoreError};

/// Provision `task`, returning the state the record ended in.
///
/// Tasks for records that are gone or no longer `deploying` are skipped.
/// `pause` is called between attempts with the backoff to wait.
///
/// # Errors
///
/// Returns an error if the store fails while recording the outcome.
pub fn run_deploy(
    store: &dyn ResourceStore,
    provisioner: &dyn Provisioner,
    config: &SmarterConfig,
    task: &DeployTask,
    pause: &dyn Fn(Duration),
) -> Result<Option<DeployState>, StoreError> {
    let Some(record) = store.find(&task.key)? else {
        tracing::warn!(key = %task.key, "deploy task for missing record skipped");
        return Ok(None);
    };
    if record.deploy_state != DeployState::Deploying {
        tracing::warn!(key = %task.key, state = %record.deploy_state, "deploy task skipped");
        return Ok(Some(record.deploy_state));
    }

    let target = ProvisionTarget {
        hosts: record_hosts(
            &record,
            config.platform.environment,
            &config.platform.api_domain,
        ),
        key: record.key,
    };
    let max_attempts = config.broker.deploy_max_attempts.max(1);
    let backoff = Duration::from_millis(config.broker.deploy_backoff_ms);

    let mut attempt = 1;
    let (to, event, message) = loop {
        tracing::info!(key = %target.key, attempt, max_attempts, "provisioning");
        match provisioner.provision(&target) {
            Ok(message) => break (DeployState::Deployed, EventKind::Deployed, message),
            Err(reason) if attempt < max_attempts => {
                tracing::warn!(key = %target.key, attempt, %reason, "provisioning failed, retrying");
                store.append_event(
                    &target.key,
                    EventKind::DeployRetry,
                    &format!("attempt {attempt} of {max_attempts} failed: {reason}"),
                )?;
                pause(backoff * attempt);
                attempt += 1;
            }
            Err(reason) => {
                tracing::error!(key = %target.key, attempt, %reason, "provisioning failed");
                break (
                    DeployState::Failed,
                    EventKind::DeployFailed,
                    format!("gave up after {attempt} attempts: {reason}"),
                );
            }
        }
    };

    match store.transition(&target.key, &[DeployState::Deploying], to, event, &message)? {
        Transition::Applied(record) => Ok(Some(record.deploy_state)),
        Transition::Rejected(state) => Ok(Some(state)),
        Transition::Missing => Ok(None),
    }
}

/// Hand every record left in `deploying` by an earlier process back to
/// `tasks`. A record the queue refuses is marked `failed`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or updated.
pub fn requeue_interrupted(
    store: &dyn ResourceStore,
    tasks: &dyn TaskQueue,
) -> Result<usize, StoreError> {
    let keys = store.deploying()?;
    for key in &keys {
        tracing::info!(%key, "re-queueing interrupted deploy");
        store.append_event(key, EventKind::DeployRetry, "re-queued after restart")?;
        if let Err(reason) = tasks.enqueue(DeployTask { key: key.clone() }) {
            tracing::error!(%key, %reason, "cannot re-queue deploy");
            store.transition(
                key,
                &[DeployState::Deploying],
                DeployState::Failed,
                EventKind::DeployFailed,
                &reason,
            )?;
        }
    }
    Ok(keys.len())
}
