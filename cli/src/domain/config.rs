//! Domain types and validators for Smarter configuration.
//!
//! Pure functions only; no I/O, no async, no filesystem access.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::routing::Environment;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.smarter/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SmarterConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Socket address `smarter serve` binds to.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// SQLite file; a leading `~/` is expanded by the store.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.smarter/smarter.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformConfig {
    pub environment: Environment,
    pub api_domain: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            api_domain: "api.smarter.sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrokerConfig {
    /// Attempts for an `apply` that hits a busy database or a uniqueness race.
    pub apply_max_retries: u32,
    /// Provisioning attempts before a deploy is marked `failed`.
    pub deploy_max_attempts: u32,
    /// Linear backoff step between provisioning attempts.
    pub deploy_backoff_ms: u64,
    /// Time one provisioning attempt may take before a `deploying` record
    /// counts as stalled.
    pub deploy_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            apply_max_retries: 3,
            deploy_max_attempts: 3,
            deploy_backoff_ms: 500,
            deploy_timeout_secs: 300,
        }
    }
}

impl BrokerConfig {
    /// How long a deploy may stay silent before `deploy` or `undeploy` may
    /// take it over: every attempt's timeout plus every backoff pause.
    #[must_use]
    pub fn deploy_stall_after(&self) -> Duration {
        let attempts = u64::from(self.deploy_max_attempts.max(1));
        let pauses = attempts * (attempts - 1) / 2;
        Duration::from_secs(self.deploy_timeout_secs.saturating_mul(attempts))
            + Duration::from_millis(self.deploy_backoff_ms.saturating_mul(pauses))
    }
}

// ── Environment overrides ────────────────────────────────────────────────────

/// `SMARTER_*` variables, each optional. Deserialized with `envy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvOverrides {
    pub listen_addr: Option<String>,
    pub database_path: Option<String>,
    pub environment: Option<String>,
    pub api_domain: Option<String>,
    pub apply_max_retries: Option<u32>,
    pub deploy_max_attempts: Option<u32>,
    pub deploy_backoff_ms: Option<u64>,
    pub deploy_timeout_secs: Option<u64>,
}

impl SmarterConfig {
    /// Overlay environment overrides field by field.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMARTER_ENVIRONMENT` names an unknown environment.
    pub fn apply_env(&mut self, env: EnvOverrides) -> Result<(), ConfigError> {
        if let Some(v) = env.listen_addr {
            self.server.listen_addr = v;
        }
        if let Some(v) = env.database_path {
            self.database.path = v;
        }
        if let Some(v) = env.environment {
            self.platform.environment = v.parse().map_err(|message| {
                ConfigError::InvalidValue {
                    key: "platform.environment",
                    message,
                }
            })?;
        }
        if let Some(v) = env.api_domain {
            self.platform.api_domain = v;
        }
        if let Some(v) = env.apply_max_retries {
            self.broker.apply_max_retries = v;
        }
        if let Some(v) = env.deploy_max_attempts {
            self.broker.deploy_max_attempts = v;
        }
        if let Some(v) = env.deploy_backoff_ms {
            self.broker.deploy_backoff_ms = v;
        }
        if let Some(v) = env.deploy_timeout_secs {
            self.broker.deploy_timeout_secs = v;
        }
        Ok(())
    }

    /// Validate the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.server.listen_addr.parse::<SocketAddr>() {
            return Err(ConfigError::InvalidValue {
                key: "server.listenAddr",
                message: format!("'{}' is not a socket address ({e})", self.server.listen_addr),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        if self.platform.api_domain.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "platform.apiDomain",
                message: "must not be empty".to_string(),
            });
        }
        if self.broker.apply_max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "broker.applyMaxRetries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.broker.deploy_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "broker.deployMaxAttempts",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
