//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;

use anyhow::Result;
use smarter_common::{DeployState, Kind};

use crate::domain::{
    EventKind, NewCredential, ResourceDraft, ResourceEvent, ResourceKey, ResourceRecord,
    SmarterConfig, StoreError, UpsertOutcome,
};

// ── Persistence Port ──────────────────────────────────────────────────────────

/// Outcome of a guarded deploy-state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The record was in an allowed state and has moved.
    Applied(ResourceRecord),
    /// The record exists but was in this (disallowed) state.
    Rejected(DeployState),
    /// No such record.
    Missing,
}

/// Outcome of a guarded delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion {
    Deleted,
    /// Other records in the account still point at the target.
    Referenced(Vec<ResourceKey>),
    /// The record is mid-deploy.
    Rejected(DeployState),
    Missing,
}

/// Tenant-scoped record storage.
///
/// Every method is synchronous; async callers run them on a blocking thread.
/// Implementations must make `upsert`, `delete` and `transition` atomic.
pub trait ResourceStore: Send + Sync {
    /// Create an account row. Returns `false` if it already existed.
    fn create_account(&self, account: &str, company_name: &str) -> Result<bool, StoreError>;

    fn account_exists(&self, account: &str) -> Result<bool, StoreError>;

    fn find(&self, key: &ResourceKey) -> Result<Option<ResourceRecord>, StoreError>;

    /// Records of one kind in one account, ordered by name.
    fn list(&self, account: &str, kind: Kind) -> Result<Vec<ResourceRecord>, StoreError>;

    /// Insert or update keyed by `draft.key`, writing the journal event (and
    /// the credential child row, on insert) in the same transaction.
    ///
    /// Fails with `MissingReference` when a `draft.required` target is absent
    /// and with `DomainInUse` when another ChatBot already serves the draft's
    /// custom domain.
    fn upsert(
        &self,
        draft: &ResourceDraft,
        credential: Option<&NewCredential>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Permanently remove a record with its journal and child rows, unless
    /// another record references it or it is `deploying`. The check and the
    /// removal happen in one transaction.
    fn delete(&self, key: &ResourceKey) -> Result<Deletion, StoreError>;

    /// Move `key` to `to` if its current state is one of `from`, appending
    /// `event` with `message`.
    fn transition(
        &self,
        key: &ResourceKey,
        from: &[DeployState],
        to: DeployState,
        event: EventKind,
        message: &str,
    ) -> Result<Transition, StoreError>;

    fn append_event(
        &self,
        key: &ResourceKey,
        event: EventKind,
        message: &str,
    ) -> Result<(), StoreError>;

    /// Journal of `key`, oldest first.
    fn events(&self, key: &ResourceKey) -> Result<Vec<ResourceEvent>, StoreError>;

    /// Every record left in `deploying`, in any account.
    fn deploying(&self) -> Result<Vec<ResourceKey>, StoreError>;

    /// ApiKey owning a credential with this token digest.
    fn find_credential(&self, digest: &str) -> Result<Option<ResourceKey>, StoreError>;

    /// ChatBot of `account` whose `spec.config.customDomain` equals `domain`,
    /// ignoring case.
    fn find_chatbot_by_domain(
        &self,
        account: &str,
        domain: &str,
    ) -> Result<Option<ResourceKey>, StoreError>;
}

// ── Deploy Ports ──────────────────────────────────────────────────────────────

/// A request to provision a deployable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTask {
    pub key: ResourceKey,
}

/// Hands deploy work to whatever runs it (background worker or inline).
pub trait TaskQueue: Send + Sync {
    /// # Errors
    ///
    /// Returns an error message if the queue no longer accepts work.
    fn enqueue(&self, task: DeployTask) -> Result<(), String>;
}

/// What to provision for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionTarget {
    pub key: ResourceKey,
    /// Hostnames to serve; empty for Plugins.
    pub hosts: Vec<String>,
}

/// External side of a deploy: DNS, TLS, ingress.
pub trait Provisioner: Send + Sync {
    /// Provision `target`, returning a message for the journal.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure; the caller decides whether to retry.
    fn provision(&self, target: &ProvisionTarget) -> Result<String, String>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration loading so commands can be tested without a home directory.
pub trait ConfigStore {
    /// Load the merged configuration.
    fn load(&self) -> Result<SmarterConfig>;
    /// Path of the configuration file (which may not exist).
    fn path(&self) -> Result<PathBuf>;
}
