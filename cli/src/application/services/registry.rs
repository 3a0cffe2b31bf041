//! Application service: the kind registry.
//!
//! One broker per `Kind`, built once at startup and shared read-only.
//! There is no runtime registration.

use smarter_common::{BrokerResponse, Kind, Outcome, Verb};

use crate::application::services::broker::{Broker, BrokerContext, ResourceBroker};
use crate::application::services::controller::PluginController;
use crate::application::transformers::{
    AccountTransformer, ApiConnectionTransformer, ApiKeyTransformer, ChatBotTransformer,
    SecretTransformer, SqlConnectionTransformer, UserTransformer,
};
use crate::domain::BrokerError;
use crate::domain::manifest::RawManifest;

pub struct KindRegistry {
    /// Indexed by `Kind::index`.
    brokers: Vec<Box<dyn Broker>>,
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRegistry")
            .field("kinds", &self.brokers.iter().map(|b| b.kind()).collect::<Vec<_>>())
            .finish()
    }
}

impl KindRegistry {
    /// Build every broker, compiling all schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if any generated schema fails to compile.
    pub fn new() -> Result<Self, String> {
        let brokers: Vec<Box<dyn Broker>> = vec![
            Box::new(ResourceBroker::<AccountTransformer>::new()?),
            Box::new(ResourceBroker::<UserTransformer>::new()?),
            Box::new(ResourceBroker::<ApiKeyTransformer>::new()?),
            Box::new(ResourceBroker::<SecretTransformer>::new()?),
            Box::new(ResourceBroker::<SqlConnectionTransformer>::new()?),
            Box::new(ResourceBroker::<ApiConnectionTransformer>::new()?),
            Box::new(PluginController::new()?),
            Box::new(ResourceBroker::<ChatBotTransformer>::new()?),
        ];
        for (broker, kind) in brokers.iter().zip(Kind::ALL) {
            if broker.kind() != kind {
                return Err(format!("registry slot for {kind} holds {}", broker.kind()));
            }
        }
        Ok(Self { brokers })
    }

    #[must_use]
    pub fn broker(&self, kind: Kind) -> &dyn Broker {
        self.brokers[kind.index()].as_ref()
    }

    /// Resolve a kind string (any case, singular or plural).
    ///
    /// # Errors
    ///
    /// `UnknownKind` when the string names no registered kind.
    pub fn resolve(&self, kind: &str) -> Result<&dyn Broker, BrokerError> {
        Ok(self.broker(kind.parse::<Kind>()?))
    }

    /// Apply a manifest with the broker named by its `kind`.
    ///
    /// # Errors
    ///
    /// Any broker error.
    pub fn apply(&self, ctx: &BrokerContext<'_>, raw: &RawManifest) -> Result<BrokerResponse, BrokerError> {
        self.resolve(raw.kind())?.apply(ctx, raw)
    }

    /// Dispatch a non-`apply` verb.
    ///
    /// # Errors
    ///
    /// `BadRequest` when a name is missing (or `apply` is requested here),
    /// otherwise any broker error.
    pub fn run(
        &self,
        ctx: &BrokerContext<'_>,
        verb: Verb,
        kind: &str,
        name: Option<&str>,
    ) -> Result<BrokerResponse, BrokerError> {
        let broker = self.resolve(kind)?;
        let named = || {
            name.ok_or_else(|| BrokerError::BadRequest(format!("{verb} requires a resource name")))
        };
        match verb {
            Verb::Apply => Err(BrokerError::BadRequest(
                "apply takes a manifest, not a kind and name".to_string(),
            )),
            Verb::Get => broker.get(ctx, name),
            Verb::Describe => broker.describe(ctx, named()?),
            Verb::Delete => broker.delete(ctx, named()?),
            Verb::Deploy => broker.deploy(ctx, named()?),
            Verb::Undeploy => broker.undeploy(ctx, named()?),
            Verb::Status => broker.status(ctx, named()?),
            Verb::Logs => broker.logs(ctx, named()?),
            Verb::Schema => Ok(BrokerResponse::new(broker.kind(), verb, Outcome::Ok, broker.schema())),
            Verb::Example => Ok(BrokerResponse::new(broker.kind(), verb, Outcome::Ok, broker.example())),
        }
    }
}
