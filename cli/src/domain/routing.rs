//! ChatBot host routing.
//!
//! Platform hosts have the form `[chatbot].[account].[env].[apiDomain]`,
//! with the `[env]` label dropped in `prod`. Any other host is treated as a
//! ChatBot custom domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::names::{is_account_number, is_dns_label};
use crate::domain::record::ResourceRecord;

/// Deployment environment of this platform instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Alpha,
    Beta,
    Next,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Environment::Local,
        Environment::Alpha,
        Environment::Beta,
        Environment::Next,
        Environment::Prod,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Alpha => "alpha",
            Environment::Beta => "beta",
            Environment::Next => "next",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Environment::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or_else(|| {
                format!("unknown environment '{s}': expected local, alpha, beta, next or prod")
            })
    }
}

/// What a request host points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTarget {
    /// A platform-generated ChatBot host.
    ChatBot { account: String, chatbot: String },
    /// Anything outside the API domain; looked up by `customDomain`.
    Custom(String),
}

/// Platform hostname for a ChatBot.
#[must_use]
pub fn chatbot_host(chatbot: &str, account: &str, env: Environment, api_domain: &str) -> String {
    match env {
        Environment::Prod => format!("{chatbot}.{account}.{api_domain}"),
        other => format!("{chatbot}.{account}.{other}.{api_domain}"),
    }
}

/// Public URL for a host. Local instances serve plain HTTP.
#[must_use]
pub fn public_url(host: &str, env: Environment) -> String {
    match env {
        Environment::Local => format!("http://{host}/"),
        _ => format!("https://{host}/"),
    }
}

/// Hosts a deployed record serves: the platform host, then its
/// `customDomain` if one is set. Only ChatBots have hosts.
#[must_use]
pub fn record_hosts(record: &ResourceRecord, env: Environment, api_domain: &str) -> Vec<String> {
    if record.key.kind != smarter_common::Kind::ChatBot {
        return Vec::new();
    }
    let mut hosts = vec![chatbot_host(&record.key.name, &record.key.account, env, api_domain)];
    if let Some(domain) = record
        .spec
        .pointer("/config/customDomain")
        .and_then(serde_json::Value::as_str)
    {
        hosts.push(domain.to_ascii_lowercase());
    }
    hosts
}

/// Map a request host to its target.
///
/// Returns `None` for hosts under `api_domain` that do not follow the
/// platform pattern for this environment.
#[must_use]
pub fn parse_host(host: &str, env: Environment, api_domain: &str) -> Option<HostTarget> {
    let host = normalize_host(host);
    let api_domain = api_domain.to_ascii_lowercase();

    let Some(prefix) = host
        .strip_suffix(api_domain.as_str())
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        if host == api_domain {
            return None;
        }
        return Some(HostTarget::Custom(host));
    };

    let labels: Vec<&str> = prefix.split('.').collect();
    let (chatbot, account) = match (env, labels.as_slice()) {
        (Environment::Prod, [chatbot, account]) => (*chatbot, *account),
        (_, [chatbot, account, label]) if *label == env.as_str() => (*chatbot, *account),
        _ => return None,
    };

    if !is_dns_label(chatbot) || !is_account_number(account) {
        return None;
    }
    Some(HostTarget::ChatBot {
        account: account.to_string(),
        chatbot: chatbot.to_string(),
    })
}

/// Lowercase, drop a trailing dot and any `:port`.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}
