use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{default_max_tokens, default_provider};

/// Function names a ChatBot may enable without a plugin.
pub const BUILTIN_FUNCTIONS: &[&str] = &["get_current_weather", "date_calculator"];

/// Spec of a `ChatBot` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatBotSpec {
    pub config: ChatBotConfig,
    /// Plugin names; resolved when the ChatBot is deployed.
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatBotConfig {
    /// Serve on this host instead of the generated platform host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_assistant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_welcome_message: Option<String>,
    #[serde(default)]
    pub app_example_prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_info_url: Option<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_system_role: Option<String>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.5
}
