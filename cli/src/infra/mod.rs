//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: SQLite storage, the
//! config file, the deploy worker and the bundled provisioner.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands`, `crate::api` or `crate::output` are forbidden.

pub mod config;
pub mod provisioner;
pub mod store;
pub mod worker;

pub use config::YamlConfigStore;
pub use provisioner::HostProvisioner;
pub use store::SqliteStore;
pub use worker::{ChannelTaskQueue, DeployRunner, InlineTaskQueue};
