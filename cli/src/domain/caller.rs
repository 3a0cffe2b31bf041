//! The authenticated principal a verb runs on behalf of.

use crate::domain::error::BrokerError;

/// `(account, user, isAdmin)` resolved from an API key or local flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account: String,
    pub username: String,
    pub is_admin: bool,
}

impl Caller {
    #[must_use]
    pub fn new(account: impl Into<String>, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            is_admin,
        }
    }

    /// # Errors
    ///
    /// Returns `BrokerError::Permission` when the caller is not an account admin.
    pub fn require_admin(&self, action: &str) -> Result<(), BrokerError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(BrokerError::Permission(format!(
                "user '{}' must be an account admin to {action}",
                self.username
            )))
        }
    }
}
