//! Shared fixture: a bootstrapped account on an in-memory store.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::Value;
use smarter_cli::application::services::identity::bootstrap;
use smarter_cli::application::services::{BrokerContext, KindRegistry};
use smarter_cli::domain::manifest::{ManifestFormat, load};
use smarter_cli::domain::{BrokerError, Caller, SmarterConfig};
use smarter_cli::infra::{DeployRunner, HostProvisioner, InlineTaskQueue, SqliteStore};
use smarter_common::{BrokerResponse, Kind, Verb};

pub const ACCOUNT: &str = "3141-5926-5359";
pub const OTHER_ACCOUNT: &str = "2718-2818-2845";
pub const ADMIN: &str = "mcdaniel";

pub struct Fixture {
    pub store: Arc<SqliteStore>,
    pub registry: KindRegistry,
    pub tasks: InlineTaskQueue,
    pub config: Arc<SmarterConfig>,
    /// Token of the bootstrap API key of `ACCOUNT`.
    pub token: String,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
        Self::with_store(store)
    }

    pub fn with_store(store: Arc<SqliteStore>) -> Self {
        let mut config = SmarterConfig::default();
        config.broker.deploy_backoff_ms = 0;
        let config = Arc::new(config);
        let registry = KindRegistry::new().expect("schemas compile");
        let tasks = InlineTaskQueue::new(DeployRunner {
            store: store.clone(),
            provisioner: Arc::new(HostProvisioner::new(config.platform.environment)),
            config: config.clone(),
        });
        let mut fixture = Self {
            store,
            registry,
            tasks,
            config,
            token: String::new(),
        };
        fixture.token = fixture
            .bootstrap(ACCOUNT, ADMIN)
            .token
            .expect("first bootstrap issues a token");
        fixture
    }

    pub fn bootstrap(
        &self,
        account: &str,
        admin: &str,
    ) -> smarter_cli::application::services::identity::BootstrapReport {
        let caller = Caller::new(account, admin, true);
        bootstrap(
            &self.registry,
            &self.ctx(&caller),
            "Stackademy",
            &format!("{admin}@example.com"),
        )
        .expect("bootstrap")
    }

    pub fn admin(&self) -> Caller {
        Caller::new(ACCOUNT, ADMIN, true)
    }

    pub fn ctx<'a>(&'a self, caller: &'a Caller) -> BrokerContext<'a> {
        BrokerContext {
            caller,
            store: self.store.as_ref(),
            tasks: &self.tasks,
            config: &self.config,
        }
    }

    pub fn apply_text(&self, caller: &Caller, text: &str) -> Result<BrokerResponse, BrokerError> {
        let raw = load(text, None)?;
        self.registry.apply(&self.ctx(caller), &raw)
    }

    pub fn apply_value(&self, caller: &Caller, manifest: &Value) -> Result<BrokerResponse, BrokerError> {
        let raw = load(&manifest.to_string(), Some(ManifestFormat::Json))?;
        self.registry.apply(&self.ctx(caller), &raw)
    }

    pub fn run(
        &self,
        caller: &Caller,
        verb: Verb,
        kind: &str,
        name: Option<&str>,
    ) -> Result<BrokerResponse, BrokerError> {
        self.registry.run(&self.ctx(caller), verb, kind, name)
    }

    /// The registry's example manifest for `kind`.
    pub fn example(&self, kind: Kind) -> Value {
        self.registry.broker(kind).example()
    }

    /// Secret, SqlConnection, Plugin and ChatBot from the examples, in
    /// dependency order.
    pub fn apply_stackademy(&self, caller: &Caller) {
        for kind in [Kind::Secret, Kind::SqlConnection, Kind::Plugin, Kind::ChatBot] {
            self.apply_value(caller, &self.example(kind))
                .unwrap_or_else(|e| panic!("apply example {kind}: {e}"));
        }
    }
}

/// Field paths of a validation error.
pub fn invalid_paths(err: &BrokerError) -> Vec<String> {
    err.fields().iter().map(|f| f.path.clone()).collect()
}
