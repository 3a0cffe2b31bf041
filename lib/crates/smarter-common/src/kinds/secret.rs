use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Placeholder `describe` emits instead of a secret value. Applying it
/// leaves the stored value untouched.
pub const SECRET_MASK: &str = "********";

/// Spec of a `Secret` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretSpec {
    pub value: String,
    /// Expiry date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl SecretSpec {
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.value == SECRET_MASK
    }
}
