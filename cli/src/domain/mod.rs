//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod caller;
pub mod config;
pub mod credential;
pub mod error;
pub mod manifest;
pub mod names;
pub mod record;
pub mod routing;

pub use caller::Caller;
pub use config::SmarterConfig;
pub use error::{BrokerError, ConfigError, StoreError};
pub use record::{
    EventKind, NewCredential, Reference, ResourceDraft, ResourceEvent, ResourceKey,
    ResourceRecord, UpsertOutcome,
};
pub use routing::{Environment, HostTarget};
