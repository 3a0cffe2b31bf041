//! Plugin specs.
//!
//! A Plugin has three structural variants, selected by `spec.data.type`.
//! `selector` and `prompt` are shared; `data` is variant-specific.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{default_max_tokens, default_provider};

/// Plugin variant discriminator (`spec.data.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PluginClass {
    Static,
    Sql,
    Api,
}

impl PluginClass {
    pub const ALL: [PluginClass; 3] = [PluginClass::Static, PluginClass::Sql, PluginClass::Api];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PluginClass::Static => "static",
            PluginClass::Sql => "sql",
            PluginClass::Api => "api",
        }
    }
}

impl fmt::Display for PluginClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| format!("unknown plugin class '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectorDirective {
    /// Activate when the prompt contains one of `searchTerms`.
    SearchTerms,
    /// Activate on every prompt.
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginSelector {
    pub directive: SelectorDirective,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginPrompt {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub system_role: String,
    pub model: String,
    /// `0.0..=2.0`.
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Spec shared by all plugin variants; `D` is the variant's `data` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginSpec<D> {
    pub selector: PluginSelector,
    pub prompt: PluginPrompt,
    pub data: D,
}

pub type StaticPluginSpec = PluginSpec<StaticPluginData>;
pub type SqlPluginSpec = PluginSpec<SqlPluginData>;
pub type ApiPluginSpec = PluginSpec<ApiPluginData>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaticPluginData {
    #[serde(rename = "type")]
    pub class: PluginClass,
    pub description: String,
    /// Arbitrary JSON returned to the LLM verbatim.
    pub static_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlPluginData {
    #[serde(rename = "type")]
    pub class: PluginClass,
    pub description: String,
    pub sql_data: SqlData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlData {
    /// Name of a `SqlConnection` in the same account.
    pub connection: String,
    /// Query text; `{name}` placeholders bind declared parameters.
    pub sql_query: String,
    #[serde(default)]
    pub parameters: Vec<PluginParameter>,
    #[serde(default)]
    pub test_values: Vec<TestValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiPluginData {
    #[serde(rename = "type")]
    pub class: PluginClass,
    pub description: String,
    pub api_data: ApiData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiData {
    /// Name of an `ApiConnection` in the same account.
    pub connection: String,
    /// Path appended to the connection's base URL; starts with `/`.
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub parameters: Vec<PluginParameter>,
    #[serde(default)]
    pub test_values: Vec<TestValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TestValue {
    pub name: String,
    pub value: serde_json::Value,
}
