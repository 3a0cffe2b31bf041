//! Per-kind `spec` schemas.
//!
//! Every struct here rejects unknown fields and fills defaults on
//! deserialization, so a re-serialized spec is fully normalized.

pub mod account;
pub mod api_key;
pub mod chatbot;
pub mod connection;
pub mod plugin;
pub mod secret;
pub mod user;

pub use account::AccountSpec;
pub use api_key::ApiKeySpec;
pub use chatbot::{BUILTIN_FUNCTIONS, ChatBotConfig, ChatBotSpec};
pub use connection::{ApiConnectionSpec, AuthMethod, DbEngine, SqlConnectionSpec};
pub use plugin::{
    ApiData, ApiPluginData, ApiPluginSpec, HttpMethod, ParameterType, PluginClass,
    PluginParameter, PluginPrompt, PluginSelector, PluginSpec, SelectorDirective, SqlData,
    SqlPluginData, SqlPluginSpec, StaticPluginData, StaticPluginSpec, TestValue,
};
pub use secret::{SECRET_MASK, SecretSpec};
pub use user::UserSpec;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_timeout() -> u32 {
    30
}

pub(crate) fn default_provider() -> String {
    "openai".to_string()
}

pub(crate) fn default_max_tokens() -> u32 {
    2048
}
