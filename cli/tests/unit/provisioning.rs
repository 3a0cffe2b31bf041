//! Deploy worker: retries, backoff and terminal states.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::time::Duration;

use mockall::{Sequence, mock};
use smarter_cli::application::ports::{
    DeployTask, ProvisionTarget, Provisioner, ResourceStore, TaskQueue,
};
use smarter_cli::application::services::BrokerContext;
use smarter_cli::application::services::provisioning::{requeue_interrupted, run_deploy};
use smarter_cli::domain::{EventKind, ResourceKey, SmarterConfig};
use smarter_common::{DeployState, Kind, Outcome, Verb};

use crate::helpers::{ACCOUNT, Fixture};

mock! {
    pub Provisioner {}

    impl Provisioner for Provisioner {
        fn provision(&self, target: &ProvisionTarget) -> Result<String, String>;
    }
}

/// A ChatBot already moved to `deploying`.
fn deploying_chatbot(fx: &Fixture) -> ResourceKey {
    let admin = fx.admin();
    fx.apply_value(&admin, &fx.example(Kind::ChatBot)).unwrap();
    let key = ResourceKey::new(ACCOUNT, Kind::ChatBot, "stackademy-sql");
    fx.store
        .transition(
            &key,
            &[DeployState::NotDeployed],
            DeployState::Deploying,
            EventKind::DeployRequested,
            "deploy requested by test",
        )
        .unwrap();
    key
}

fn config(attempts: u32) -> SmarterConfig {
    let mut config = SmarterConfig::default();
    config.broker.deploy_max_attempts = attempts;
    config.broker.deploy_backoff_ms = 100;
    config
}

fn event_names(fx: &Fixture, key: &ResourceKey) -> Vec<EventKind> {
    fx.store.events(key).unwrap().into_iter().map(|e| e.event).collect()
}

#[test]
fn test_retries_then_settles_deployed() {
    let fx = Fixture::new();
    let key = deploying_chatbot(&fx);

    let mut provisioner = MockProvisioner::new();
    let mut seq = Sequence::new();
    provisioner
        .expect_provision()
        .withf(|target| target.hosts[0] == format!("stackademy-sql.{ACCOUNT}.local.api.smarter.sh"))
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Err("dns timeout".to_string()));
    provisioner
        .expect_provision()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("serving".to_string()));

    let pauses = RefCell::new(Vec::new());
    let state = run_deploy(
        fx.store.as_ref(),
        &provisioner,
        &config(3),
        &DeployTask { key: key.clone() },
        &|d| pauses.borrow_mut().push(d),
    )
    .unwrap();

    assert_eq!(state, Some(DeployState::Deployed));
    assert_eq!(
        pauses.into_inner(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert_eq!(
        event_names(&fx, &key),
        vec![
            EventKind::Created,
            EventKind::DeployRequested,
            EventKind::DeployRetry,
            EventKind::DeployRetry,
            EventKind::Deployed,
        ]
    );
}

#[test]
fn test_gives_up_after_max_attempts() {
    let fx = Fixture::new();
    let key = deploying_chatbot(&fx);

    let mut provisioner = MockProvisioner::new();
    provisioner
        .expect_provision()
        .times(2)
        .returning(|_| Err("certificate quota exceeded".to_string()));

    let state = run_deploy(
        fx.store.as_ref(),
        &provisioner,
        &config(2),
        &DeployTask { key: key.clone() },
        &|_| {},
    )
    .unwrap();

    assert_eq!(state, Some(DeployState::Failed));
    let record = fx.store.find(&key).unwrap().unwrap();
    assert_eq!(record.deploy_state, DeployState::Failed);
    assert_eq!(
        record.deploy_message.as_deref(),
        Some("gave up after 2 attempts: certificate quota exceeded")
    );
    let last = fx.store.events(&key).unwrap().pop().unwrap();
    assert_eq!(last.event, EventKind::DeployFailed);
}

#[test]
fn test_task_for_settled_record_is_skipped() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_value(&admin, &fx.example(Kind::ChatBot)).unwrap();
    let key = ResourceKey::new(ACCOUNT, Kind::ChatBot, "stackademy-sql");

    let mut provisioner = MockProvisioner::new();
    provisioner.expect_provision().never();

    let state = run_deploy(fx.store.as_ref(), &provisioner, &config(3), &DeployTask { key }, &|_| {})
        .unwrap();
    assert_eq!(state, Some(DeployState::NotDeployed));

    let missing = ResourceKey::new(ACCOUNT, Kind::ChatBot, "gone");
    let state = run_deploy(
        fx.store.as_ref(),
        &provisioner,
        &config(3),
        &DeployTask { key: missing },
        &|_| {},
    )
    .unwrap();
    assert_eq!(state, None);
}

#[test]
fn test_failed_record_can_be_redeployed() {
    let fx = Fixture::new();
    let key = deploying_chatbot(&fx);
    let mut provisioner = MockProvisioner::new();
    provisioner.expect_provision().returning(|_| Err("down".to_string()));
    run_deploy(fx.store.as_ref(), &provisioner, &config(1), &DeployTask { key }, &|_| {}).unwrap();

    // Plugins named by the ChatBot must exist before a real deploy.
    fx.apply_value(&fx.admin(), &fx.example(Kind::Secret)).unwrap();
    fx.apply_value(&fx.admin(), &fx.example(Kind::SqlConnection)).unwrap();
    fx.apply_value(&fx.admin(), &fx.example(Kind::Plugin)).unwrap();
    let resp = fx
        .run(&fx.admin(), smarter_common::Verb::Deploy, "chatbot", Some("stackademy-sql"))
        .unwrap();
    assert_eq!(resp.outcome, smarter_common::Outcome::Deploying);
}

/// Accepts every task and runs none of them, like a queue whose process died.
struct DroppingQueue;

impl TaskQueue for DroppingQueue {
    fn enqueue(&self, _task: DeployTask) -> Result<(), String> {
        Ok(())
    }
}

/// A queue that has shut down.
struct ClosedQueue;

impl TaskQueue for ClosedQueue {
    fn enqueue(&self, _task: DeployTask) -> Result<(), String> {
        Err("deploy queue is closed".to_string())
    }
}

/// Deploys the stackademy ChatBot through `tasks`; with a dropping queue it
/// stays `deploying`.
fn deploy_through(fx: &Fixture, tasks: &dyn TaskQueue) -> ResourceKey {
    let admin = fx.admin();
    fx.apply_stackademy(&admin);
    let ctx = BrokerContext {
        caller: &admin,
        store: fx.store.as_ref(),
        tasks,
        config: &fx.config,
    };
    let resp = fx
        .registry
        .run(&ctx, Verb::Deploy, "chatbot", Some("stackademy-sql"))
        .unwrap();
    assert_eq!(resp.outcome, Outcome::Deploying);
    ResourceKey::new(ACCOUNT, Kind::ChatBot, "stackademy-sql")
}

fn no_stall_window() -> SmarterConfig {
    let mut config = SmarterConfig::default();
    config.broker.deploy_timeout_secs = 0;
    config.broker.deploy_backoff_ms = 0;
    config
}

#[test]
fn test_lost_deploy_blocks_lifecycle_until_stalled() {
    let fx = Fixture::new();
    let key = deploy_through(&fx, &DroppingQueue);
    let admin = fx.admin();

    for verb in [Verb::Deploy, Verb::Undeploy, Verb::Delete] {
        let err = fx.run(&admin, verb, "chatbot", Some("stackademy-sql")).unwrap_err();
        assert_eq!(err.code(), "PreconditionError", "{verb:?}");
    }
    assert_eq!(fx.store.find(&key).unwrap().unwrap().deploy_state, DeployState::Deploying);

    let stalled = no_stall_window();
    let ctx = BrokerContext {
        caller: &admin,
        store: fx.store.as_ref(),
        tasks: &fx.tasks,
        config: &stalled,
    };
    let resp = fx
        .registry
        .run(&ctx, Verb::Undeploy, "chatbot", Some("stackademy-sql"))
        .unwrap();
    assert_eq!(resp.outcome, Outcome::Undeployed);
    let record = fx.store.find(&key).unwrap().unwrap();
    assert_eq!(record.deploy_state, DeployState::NotDeployed);
    assert!(record.deploy_message.unwrap().contains("stalled deploy abandoned"));

    let resp = fx.run(&admin, Verb::Delete, "chatbot", Some("stackademy-sql")).unwrap();
    assert_eq!(resp.outcome, Outcome::Deleted);
}

#[test]
fn test_stalled_deploy_can_be_taken_over() {
    let fx = Fixture::new();
    let key = deploy_through(&fx, &DroppingQueue);
    let admin = fx.admin();

    let stalled = no_stall_window();
    let ctx = BrokerContext {
        caller: &admin,
        store: fx.store.as_ref(),
        tasks: &fx.tasks,
        config: &stalled,
    };
    let resp = fx
        .registry
        .run(&ctx, Verb::Deploy, "chatbot", Some("stackademy-sql"))
        .unwrap();
    assert_eq!(resp.outcome, Outcome::Deploying);
    assert_eq!(fx.store.find(&key).unwrap().unwrap().deploy_state, DeployState::Deployed);

    let requests: Vec<String> = fx
        .store
        .events(&key)
        .unwrap()
        .into_iter()
        .filter(|e| e.event == EventKind::DeployRequested)
        .map(|e| e.message)
        .collect();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].ends_with("previous deploy stalled"));
}

#[test]
fn test_interrupted_deploys_are_requeued() {
    let fx = Fixture::new();
    let key = deploy_through(&fx, &DroppingQueue);

    let requeued = requeue_interrupted(fx.store.as_ref(), &fx.tasks).unwrap();
    assert_eq!(requeued, 1);
    assert_eq!(fx.store.find(&key).unwrap().unwrap().deploy_state, DeployState::Deployed);
    assert_eq!(
        event_names(&fx, &key),
        vec![
            EventKind::Created,
            EventKind::DeployRequested,
            EventKind::DeployRetry,
            EventKind::Deployed,
        ]
    );

    // Nothing left to pick up on the next start.
    assert_eq!(requeue_interrupted(fx.store.as_ref(), &fx.tasks).unwrap(), 0);
}

#[test]
fn test_requeue_into_closed_queue_fails_the_record() {
    let fx = Fixture::new();
    let key = deploy_through(&fx, &DroppingQueue);

    assert_eq!(requeue_interrupted(fx.store.as_ref(), &ClosedQueue).unwrap(), 1);
    let record = fx.store.find(&key).unwrap().unwrap();
    assert_eq!(record.deploy_state, DeployState::Failed);
    assert_eq!(record.deploy_message.as_deref(), Some("deploy queue is closed"));
}
