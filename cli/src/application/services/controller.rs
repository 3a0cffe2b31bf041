//! Application service: Plugin controller.
//!
//! Plugins come in three structural variants. `apply` is routed by the
//! raw manifest's `spec.data.type`; name-based verbs by the variant stored
//! on the record.

use serde_json::{Value, json};
use smarter_common::kinds::PluginClass;
use smarter_common::{BrokerResponse, Kind};

use crate::application::services::broker::{Broker, BrokerContext, ResourceBroker, get_records};
use crate::application::transformers::{
    ApiPluginTransformer, SqlPluginTransformer, StaticPluginTransformer,
};
use crate::domain::BrokerError;
use crate::domain::manifest::RawManifest;

/// Path of the variant discriminator.
pub const DISCRIMINATOR: &str = "spec.data.type";

pub struct PluginController {
    static_broker: ResourceBroker<StaticPluginTransformer>,
    sql_broker: ResourceBroker<SqlPluginTransformer>,
    api_broker: ResourceBroker<ApiPluginTransformer>,
}

impl PluginController {
    /// Compile every variant's schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated schema does not compile.
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            static_broker: ResourceBroker::new()?,
            sql_broker: ResourceBroker::new()?,
            api_broker: ResourceBroker::new()?,
        })
    }

    fn variant(&self, class: PluginClass) -> &dyn Broker {
        match class {
            PluginClass::Static => &self.static_broker,
            PluginClass::Sql => &self.sql_broker,
            PluginClass::Api => &self.api_broker,
        }
    }

    fn parse_class(value: &str) -> Result<PluginClass, BrokerError> {
        value.parse().map_err(|_| BrokerError::UnknownVariant {
            kind: Kind::Plugin,
            field: DISCRIMINATOR.to_string(),
            value: value.to_string(),
        })
    }

    /// Variant broker for a raw manifest.
    ///
    /// # Errors
    ///
    /// A validation error when the discriminator is missing or not a
    /// string; `UnknownVariant` when it names no variant.
    pub fn route_manifest(&self, raw: &RawManifest) -> Result<&dyn Broker, BrokerError> {
        match raw.get(DISCRIMINATOR) {
            None | Some(Value::Null) => Err(BrokerError::invalid(
                Kind::Plugin,
                DISCRIMINATOR,
                format!("is required (one of: {})", variant_names()),
            )),
            Some(Value::String(class)) => Ok(self.variant(Self::parse_class(class)?)),
            Some(other) => Err(BrokerError::invalid(
                Kind::Plugin,
                DISCRIMINATOR,
                format!("must be a string, found {other}"),
            )),
        }
    }

    /// Variant broker for a stored record.
    fn route_record(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<&dyn Broker, BrokerError> {
        let record = ctx.load(Kind::Plugin, name)?;
        let stored = record.variant.as_deref().unwrap_or_default();
        let class = stored.parse::<PluginClass>().map_err(|_| {
            BrokerError::Internal(format!("plugin '{name}' has unknown stored variant '{stored}'"))
        })?;
        Ok(self.variant(class))
    }
}

fn variant_names() -> String {
    PluginClass::ALL.map(PluginClass::as_str).join(", ")
}

impl Broker for PluginController {
    fn kind(&self) -> Kind {
        Kind::Plugin
    }

    fn schema(&self) -> Value {
        let variants: serde_json::Map<String, Value> = PluginClass::ALL
            .into_iter()
            .map(|class| (class.as_str().to_string(), self.variant(class).schema()))
            .collect();
        json!({
            "title": "Plugin",
            "discriminator": DISCRIMINATOR,
            "variants": variants,
        })
    }

    fn example(&self) -> Value {
        self.sql_broker.example()
    }

    fn apply(&self, ctx: &BrokerContext<'_>, raw: &RawManifest) -> Result<BrokerResponse, BrokerError> {
        self.route_manifest(raw)?.apply(ctx, raw)
    }

    fn get(&self, ctx: &BrokerContext<'_>, name: Option<&str>) -> Result<BrokerResponse, BrokerError> {
        get_records(ctx, Kind::Plugin, name)
    }

    fn describe(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.describe(ctx, name)
    }

    fn delete(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.delete(ctx, name)
    }

    fn deploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.deploy(ctx, name)
    }

    fn undeploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.undeploy(ctx, name)
    }

    fn status(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.status(ctx, name)
    }

    fn logs(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        self.route_record(ctx, name)?.logs(ctx, name)
    }
}
