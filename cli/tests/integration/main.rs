//! Integration tests for the smarter CLI
//!
//! These tests spawn the actual binary against a temporary database and
//! config path. They are slower and should be run separately from unit tests.

mod apply_command;
mod cli_tests;
mod support;
