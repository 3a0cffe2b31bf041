//! Command implementations

pub mod bootstrap;
pub mod config;
pub mod serve;
pub mod verbs;
pub mod version;
