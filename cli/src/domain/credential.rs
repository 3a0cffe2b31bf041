//! API key tokens.
//!
//! Tokens are shown once and persisted only as a SHA-256 digest.

use sha2::{Digest, Sha256};

pub const TOKEN_PREFIX: &str = "smr_";

/// Characters of the token kept in clear for display (`smr_1a2b3c4d`).
const DISPLAY_PREFIX_LEN: usize = 12;

/// A freshly issued token with its derived storage values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub digest: String,
    pub prefix: String,
}

/// Issue a new random token.
#[must_use]
pub fn issue_token() -> IssuedToken {
    let token = format!(
        "{TOKEN_PREFIX}{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    IssuedToken {
        digest: digest(&token),
        prefix: token.chars().take(DISPLAY_PREFIX_LEN).collect(),
        token,
    }
}

/// Hex-encoded SHA-256 of `token`.
#[must_use]
pub fn digest(token: &str) -> String {
    hex_encode(&Sha256::digest(token.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
