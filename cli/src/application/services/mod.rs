//! Application services: use-case orchestration.
//!
//! Services import only from `crate::domain` and `crate::application`,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod broker;
pub mod controller;
pub mod identity;
pub mod provisioning;
pub mod registry;
pub mod resolve;

pub use broker::{Broker, BrokerContext, ResourceBroker};
pub use controller::PluginController;
pub use registry::KindRegistry;
