use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::default_true;

/// Spec of an `ApiKey` manifest.
///
/// The key itself never appears in a manifest: it is generated when the
/// resource is created and returned once in the `apply` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiKeySpec {
    /// Username the key authenticates as.
    pub user: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}
