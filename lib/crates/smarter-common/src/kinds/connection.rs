use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::default_timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    Postgresql,
    Mysql,
    Sqlite,
    Oracle,
    Mssql,
}

/// Spec of a `SqlConnection` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlConnectionSpec {
    pub db_engine: DbEngine,
    pub hostname: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    /// Name of the `Secret` holding the password.
    pub password: String,
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub use_ssl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    None,
    Basic,
    Token,
}

/// Spec of an `ApiConnection` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiConnectionSpec {
    pub base_url: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Name of the `Secret` holding the credential; required unless
    /// `authMethod` is `none`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}
