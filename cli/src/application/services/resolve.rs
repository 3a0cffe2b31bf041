//! Application service: ChatBot host resolution.
//!
//! Lookups stay inside the caller's account: a host that belongs to
//! another account resolves exactly like one that does not exist.

use serde_json::Value;
use smarter_common::Kind;

use crate::application::services::broker::{BrokerContext, status_of};
use crate::domain::routing::parse_host;
use crate::domain::{BrokerError, HostTarget};

/// Map `host` to the ChatBot that serves it.
///
/// # Errors
///
/// `BadRequest` for a malformed platform host, `NotFound` when no ChatBot
/// in the caller's account answers on `host`.
pub fn resolve_host(ctx: &BrokerContext<'_>, host: &str) -> Result<Value, BrokerError> {
    let platform = &ctx.config.platform;
    let target = parse_host(host, platform.environment, &platform.api_domain).ok_or_else(|| {
        BrokerError::BadRequest(format!(
            "'{host}' is not a ChatBot host under {} for {}",
            platform.api_domain, platform.environment
        ))
    })?;

    let record = match target {
        HostTarget::ChatBot { account, chatbot } => {
            if account != ctx.caller.account {
                return Err(BrokerError::not_found(Kind::ChatBot, chatbot));
            }
            ctx.load(Kind::ChatBot, &chatbot)?
        }
        HostTarget::Custom(domain) => {
            let key = ctx
                .store
                .find_chatbot_by_domain(&ctx.caller.account, &domain)?
                .ok_or_else(|| BrokerError::not_found(Kind::ChatBot, domain.clone()))?;
            ctx.load(Kind::ChatBot, &key.name)?
        }
    };

    tracing::debug!(account = %ctx.caller.account, host, chatbot = %record.key.name, "resolve");
    let mut resolved = status_of(&record, ctx.config);
    resolved["account"] = Value::String(record.key.account);
    Ok(resolved)
}
