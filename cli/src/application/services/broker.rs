//! Application service: the per-kind Broker.
//!
//! `Broker` is the object-safe verb surface the registry dispatches to.
//! `ResourceBroker<T>` implements it for any `Transformer`; Plugins go
//! through `PluginController` instead. Imports only from `crate::domain`
//! and `crate::application`.

use std::marker::PhantomData;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use smarter_common::{
    BrokerResponse, DeployState, FieldError, Kind, ManifestDocument, ManifestStatus, Metadata,
    Outcome, Verb,
};

use crate::application::ports::{Deletion, DeployTask, ResourceStore, TaskQueue, Transition};
use crate::application::transformers::{FieldRef, ResolveAt, Transformer, to_json};
use crate::domain::credential::issue_token;
use crate::domain::manifest::{ManifestSchema, RawManifest};
use crate::domain::routing::{public_url, record_hosts};
use crate::domain::{
    BrokerError, Caller, EventKind, NewCredential, ResourceDraft, ResourceKey, ResourceRecord,
    SmarterConfig, StoreError, UpsertOutcome,
};

/// Everything a verb needs besides its arguments.
#[derive(Clone, Copy)]
pub struct BrokerContext<'a> {
    pub caller: &'a Caller,
    pub store: &'a dyn ResourceStore,
    pub tasks: &'a dyn TaskQueue,
    pub config: &'a SmarterConfig,
}

impl BrokerContext<'_> {
    /// Key of `name` in the caller's account.
    #[must_use]
    pub fn key(&self, kind: Kind, name: &str) -> ResourceKey {
        ResourceKey::new(self.caller.account.clone(), kind, name)
    }

    /// # Errors
    ///
    /// `NotFound` when the caller's account has no such record.
    pub fn load(&self, kind: Kind, name: &str) -> Result<ResourceRecord, BrokerError> {
        self.store
            .find(&self.key(kind, name))?
            .ok_or_else(|| BrokerError::not_found(kind, name))
    }
}

/// The verbs one kind answers.
pub trait Broker: Send + Sync {
    fn kind(&self) -> Kind;

    /// JSON Schema of the kind's `spec`.
    fn schema(&self) -> Value;

    /// A complete example manifest.
    fn example(&self) -> Value;

    /// Create or update the record named by the manifest.
    ///
    /// # Errors
    ///
    /// Validation, permission or store failures.
    fn apply(&self, ctx: &BrokerContext<'_>, raw: &RawManifest) -> Result<BrokerResponse, BrokerError>;

    /// One record by name, or every record of the kind.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing name, or store failures.
    fn get(&self, ctx: &BrokerContext<'_>, name: Option<&str>) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// `NotFound` or store failures.
    fn describe(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// `NotFound`, `Permission`, `Precondition` (still referenced) or store failures.
    fn delete(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// `BadRequest` for kinds without a lifecycle, `Precondition` when the
    /// state or references do not allow it.
    fn deploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// As for `deploy`.
    fn undeploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// `NotFound` or store failures.
    fn status(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;

    /// # Errors
    ///
    /// `NotFound` or store failures.
    fn logs(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError>;
}

/// Broker for a single-variant kind (or one Plugin variant).
pub struct ResourceBroker<T: Transformer> {
    schema: ManifestSchema<T::Spec>,
    _transformer: PhantomData<fn() -> T>,
}

impl<T: Transformer> ResourceBroker<T> {
    /// Compile the kind's schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated schema does not compile.
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            schema: ManifestSchema::compile(T::KIND)?,
            _transformer: PhantomData,
        })
    }

    /// Manifest-shaped view of a record; valid `apply` input.
    #[must_use]
    pub fn describe_record(record: &ResourceRecord) -> Value {
        let document = ManifestDocument {
            status: Some(ManifestStatus {
                created_at: record.created_at,
                updated_at: record.updated_at,
                deploy_state: record.deploy_state,
            }),
            ..ManifestDocument::new(
                record.key.kind,
                Metadata {
                    name: record.key.name.clone(),
                    description: record.description.clone(),
                    version: record.version.clone(),
                    labels: record.labels.clone(),
                },
                T::to_manifest_spec(record),
            )
        };
        serde_json::to_value(document).unwrap_or(Value::Null)
    }

    fn require_role(ctx: &BrokerContext<'_>, verb: Verb) -> Result<(), BrokerError> {
        if T::ADMIN_ONLY {
            ctx.caller.require_admin(&format!("{verb} {}", T::KIND))?;
        }
        Ok(())
    }

    /// Draft plus its apply-time references; every field error is collected first.
    fn draft(
        &self,
        ctx: &BrokerContext<'_>,
        raw: &RawManifest,
    ) -> Result<(ResourceDraft, Vec<FieldRef>), BrokerError> {
        let manifest = self.schema.validate(raw)?;

        let mut fields: Vec<FieldError> = T::check(manifest.spec());
        let references = T::references(manifest.spec());
        for field_ref in references.iter().filter(|r| r.resolve_at == ResolveAt::Apply) {
            let target = &field_ref.target;
            if ctx.store.find(&ctx.key(target.kind, &target.name))?.is_none() {
                fields.push(FieldError::new(
                    field_ref.path.clone(),
                    format!("{} '{}' does not exist", target.kind, target.name),
                ));
            }
        }
        if !fields.is_empty() {
            return Err(BrokerError::ManifestValidation { kind: T::KIND, fields });
        }

        T::authorize_apply(ctx.caller, &manifest)?;

        let key = ctx.key(T::KIND, manifest.name());
        let existing = ctx.store.find(&key)?;
        let metadata = manifest.metadata();
        let (at_apply, at_deploy): (Vec<FieldRef>, Vec<FieldRef>) = references
            .into_iter()
            .partition(|r| r.resolve_at == ResolveAt::Apply);
        let draft = ResourceDraft {
            key,
            variant: T::VARIANT.map(str::to_string),
            description: metadata.description.clone(),
            version: metadata.version.clone(),
            labels: metadata.labels.clone(),
            spec: T::to_record_spec(&manifest, existing.as_ref())?,
            references: at_apply
                .iter()
                .chain(&at_deploy)
                .map(|r| r.target.clone())
                .collect(),
            required: at_apply.iter().map(|r| r.target.clone()).collect(),
        };
        Ok((draft, at_apply))
    }

    /// Store refusals that belong to a manifest field.
    fn rejected_write(err: StoreError, required: &[FieldRef]) -> BrokerError {
        match err {
            StoreError::MissingReference(target) => {
                let path = required
                    .iter()
                    .find(|r| r.target == target)
                    .map_or_else(|| "spec".to_string(), |r| r.path.clone());
                BrokerError::invalid(
                    T::KIND,
                    path,
                    format!("{} '{}' does not exist", target.kind, target.name),
                )
            }
            StoreError::DomainInUse(domain) => BrokerError::invalid(
                T::KIND,
                "spec.config.customDomain",
                format!("'{domain}' is already served by another ChatBot"),
            ),
            other => other.into(),
        }
    }
}

impl<T: Transformer> Broker for ResourceBroker<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }

    fn schema(&self) -> Value {
        self.schema.spec_schema().clone()
    }

    fn example(&self) -> Value {
        serde_json::to_value(T::example()).unwrap_or(Value::Null)
    }

    fn apply(&self, ctx: &BrokerContext<'_>, raw: &RawManifest) -> Result<BrokerResponse, BrokerError> {
        Self::require_role(ctx, Verb::Apply)?;
        let (draft, required) = self.draft(ctx, raw)?;

        let issued = T::ISSUES_CREDENTIAL.then(issue_token);
        let credential = issued.as_ref().map(|t| NewCredential {
            digest: t.digest.clone(),
            prefix: t.prefix.clone(),
        });
        let outcome = retry_store(ctx.config.broker.apply_max_retries, || {
            ctx.store.upsert(&draft, credential.as_ref())
        })
        .map_err(|e| Self::rejected_write(e, &required))?;

        let mut data = Self::describe_record(outcome.record());
        let response = match outcome {
            UpsertOutcome::Created(_) => {
                if let (Some(token), Some(status)) = (issued, data.get_mut("status")) {
                    status["token"] = Value::String(token.token);
                }
                BrokerResponse::new(T::KIND, Verb::Apply, Outcome::Created, data)
            }
            UpsertOutcome::Updated { changed, .. } => {
                BrokerResponse::new(T::KIND, Verb::Apply, Outcome::Updated, data)
                    .with_changed(changed)
            }
        };
        tracing::info!(
            account = %ctx.caller.account,
            kind = %T::KIND,
            name = %draft.key.name,
            outcome = ?response.outcome,
            "apply"
        );
        Ok(response)
    }

    fn get(&self, ctx: &BrokerContext<'_>, name: Option<&str>) -> Result<BrokerResponse, BrokerError> {
        get_records(ctx, T::KIND, name)
    }

    fn describe(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        let record = ctx.load(T::KIND, name)?;
        tracing::debug!(account = %ctx.caller.account, kind = %T::KIND, name, "describe");
        Ok(BrokerResponse::new(
            T::KIND,
            Verb::Describe,
            Outcome::Ok,
            Self::describe_record(&record),
        ))
    }

    fn delete(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        Self::require_role(ctx, Verb::Delete)?;
        T::authorize_delete(ctx.caller, name)?;
        delete_record(ctx, T::KIND, name)
    }

    fn deploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        deploy_record(ctx, T::KIND, name)
    }

    fn undeploy(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        undeploy_record(ctx, T::KIND, name)
    }

    fn status(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        let record = ctx.load(T::KIND, name)?;
        Ok(BrokerResponse::new(
            T::KIND,
            Verb::Status,
            Outcome::Ok,
            status_of(&record, ctx.config),
        ))
    }

    fn logs(&self, ctx: &BrokerContext<'_>, name: &str) -> Result<BrokerResponse, BrokerError> {
        let key = ctx.load(T::KIND, name)?.key;
        let events = ctx.store.events(&key)?;
        Ok(BrokerResponse::new(T::KIND, Verb::Logs, Outcome::Ok, to_json(&events)?))
    }
}

// ── Verb helpers shared with the Plugin controller ───────────────────────────

/// Short listing row for `get`.
fn summary(record: &ResourceRecord) -> Value {
    let mut row = json!({
        "name": record.key.name,
        "description": record.description,
        "deployState": record.deploy_state,
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    });
    if let Some(variant) = &record.variant {
        row["variant"] = Value::String(variant.clone());
    }
    row
}

pub(crate) fn get_records(
    ctx: &BrokerContext<'_>,
    kind: Kind,
    name: Option<&str>,
) -> Result<BrokerResponse, BrokerError> {
    let data = match name {
        Some(name) => summary(&ctx.load(kind, name)?),
        None => Value::Array(
            ctx.store
                .list(&ctx.caller.account, kind)?
                .iter()
                .map(summary)
                .collect(),
        ),
    };
    tracing::debug!(account = %ctx.caller.account, %kind, ?name, "get");
    Ok(BrokerResponse::new(kind, Verb::Get, Outcome::Ok, data))
}

pub(crate) fn delete_record(
    ctx: &BrokerContext<'_>,
    kind: Kind,
    name: &str,
) -> Result<BrokerResponse, BrokerError> {
    let key = ctx.key(kind, name);
    match retry_store(ctx.config.broker.apply_max_retries, || ctx.store.delete(&key))? {
        Deletion::Deleted => {}
        Deletion::Referenced(referrers) => {
            let names: Vec<String> = referrers
                .iter()
                .map(|r| format!("{} '{}'", r.kind, r.name))
                .collect();
            return Err(BrokerError::Precondition(format!(
                "{kind} '{name}' is still referenced by {}",
                names.join(", ")
            )));
        }
        Deletion::Rejected(state) => {
            return Err(BrokerError::Precondition(format!(
                "{kind} '{name}' is {state}; wait for it to finish, or undeploy it once stalled"
            )));
        }
        Deletion::Missing => return Err(BrokerError::not_found(kind, name)),
    }
    tracing::info!(account = %ctx.caller.account, %kind, name, "delete");
    Ok(BrokerResponse::new(kind, Verb::Delete, Outcome::Deleted, json!({ "name": name })))
}

fn require_deployable(kind: Kind) -> Result<(), BrokerError> {
    if kind.is_deployable() {
        Ok(())
    } else {
        Err(BrokerError::BadRequest(format!(
            "{kind} resources have no deployment lifecycle"
        )))
    }
}

pub(crate) fn deploy_record(
    ctx: &BrokerContext<'_>,
    kind: Kind,
    name: &str,
) -> Result<BrokerResponse, BrokerError> {
    require_deployable(kind)?;
    let record = ctx.load(kind, name)?;

    let mut missing = Vec::new();
    for reference in &record.references {
        if ctx.store.find(&record.key.sibling(reference.kind, &reference.name))?.is_none() {
            missing.push(format!("{} '{}'", reference.kind, reference.name));
        }
    }
    if !missing.is_empty() {
        return Err(BrokerError::Precondition(format!(
            "cannot deploy {kind} '{name}': missing {}",
            missing.join(", ")
        )));
    }

    let mut from = vec![DeployState::NotDeployed, DeployState::Failed];
    let mut message = format!("deploy requested by {}", ctx.caller.username);
    if stalled(ctx, &record)? {
        from.push(DeployState::Deploying);
        message.push_str("; previous deploy stalled");
    }
    match ctx.store.transition(
        &record.key,
        &from,
        DeployState::Deploying,
        EventKind::DeployRequested,
        &message,
    )? {
        Transition::Applied(_) => {}
        Transition::Rejected(state) => {
            return Err(BrokerError::Precondition(format!(
                "{kind} '{name}' is already {state}"
            )));
        }
        Transition::Missing => return Err(BrokerError::not_found(kind, name)),
    }

    if let Err(reason) = ctx.tasks.enqueue(DeployTask { key: record.key.clone() }) {
        tracing::error!(key = %record.key, %reason, "cannot enqueue deploy");
        ctx.store.transition(
            &record.key,
            &[DeployState::Deploying],
            DeployState::Failed,
            EventKind::DeployFailed,
            &reason,
        )?;
        return Err(BrokerError::Internal(reason));
    }

    tracing::info!(account = %ctx.caller.account, %kind, name, "deploy requested");
    Ok(BrokerResponse::new(
        kind,
        Verb::Deploy,
        Outcome::Deploying,
        json!({ "name": name, "deployState": DeployState::Deploying }),
    ))
}

pub(crate) fn undeploy_record(
    ctx: &BrokerContext<'_>,
    kind: Kind,
    name: &str,
) -> Result<BrokerResponse, BrokerError> {
    require_deployable(kind)?;
    let record = ctx.load(kind, name)?;
    let mut from = vec![DeployState::Deployed, DeployState::Failed];
    let mut message = format!("undeployed by {}", ctx.caller.username);
    if stalled(ctx, &record)? {
        from.push(DeployState::Deploying);
        message.push_str("; stalled deploy abandoned");
    }
    match ctx.store.transition(
        &record.key,
        &from,
        DeployState::NotDeployed,
        EventKind::Undeployed,
        &message,
    )? {
        Transition::Applied(_) => {
            tracing::info!(account = %ctx.caller.account, %kind, name, "undeploy");
            Ok(BrokerResponse::new(
                kind,
                Verb::Undeploy,
                Outcome::Undeployed,
                json!({ "name": name, "deployState": DeployState::NotDeployed }),
            ))
        }
        Transition::Rejected(state) => Err(BrokerError::Precondition(format!(
            "{kind} '{name}' is {state}; only deployed, failed or stalled resources can be undeployed"
        ))),
        Transition::Missing => Err(BrokerError::not_found(kind, name)),
    }
}

/// A `deploying` record whose journal has been silent longer than the
/// provisioning budget. Its task was lost (process killed, queue gone).
fn stalled(ctx: &BrokerContext<'_>, record: &ResourceRecord) -> Result<bool, BrokerError> {
    if record.deploy_state != DeployState::Deploying {
        return Ok(false);
    }
    let last = ctx
        .store
        .events(&record.key)?
        .last()
        .map_or(record.updated_at, |e| e.at);
    let silent = (Utc::now() - last).to_std().unwrap_or_default();
    Ok(silent >= ctx.config.broker.deploy_stall_after())
}

pub(crate) fn status_of(record: &ResourceRecord, config: &SmarterConfig) -> Value {
    let mut status = json!({
        "name": record.key.name,
        "kind": record.key.kind,
        "deployState": record.deploy_state,
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    });
    if let Some(message) = &record.deploy_message {
        status["deployMessage"] = Value::String(message.clone());
    }
    if record.deploy_state == DeployState::Deployed {
        let env = config.platform.environment;
        let hosts = record_hosts(record, env, &config.platform.api_domain);
        if let Some(host) = hosts.last() {
            status["url"] = Value::String(public_url(host, env));
        }
    }
    status
}

/// Run `op`, retrying retryable store errors up to `attempts` times in total.
///
/// # Errors
///
/// The last error once attempts are exhausted, or the first fatal one.
pub fn retry_store<R>(
    attempts: u32,
    mut op: impl FnMut() -> Result<R, StoreError>,
) -> Result<R, StoreError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_retryable() && attempt < attempts => {
                tracing::debug!(attempt, error = %err, "retrying store operation");
                std::thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
                attempt += 1;
            }
            other => return other,
        }
    }
}
