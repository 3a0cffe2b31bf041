//! Unit tests for the smarter broker
//!
//! These tests run against in-memory or temp-file SQLite stores and mocked
//! provisioners; nothing leaves the process.

mod api_router;
mod helpers;
mod identity;
mod provisioning;
mod store_concurrency;
mod tenancy;
