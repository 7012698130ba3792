//! Opaque refresh token generation.

use rand::Rng;

use crate::hashing::hash_refresh_token;

/// Length of a generated refresh token (alphanumeric characters).
///
/// 48 characters from a 62-symbol alphabet is roughly 285 bits of entropy.
pub const REFRESH_TOKEN_LENGTH: usize = 48;

/// A freshly generated refresh token.
pub struct GeneratedRefreshToken {
    /// Handed to the client exactly once, never stored or logged.
    pub plaintext: String,
    /// SHA-256 hex digest persisted on the session.
    pub hash: String,
}

impl std::fmt::Debug for GeneratedRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedRefreshToken")
            .field("plaintext", &"<redacted>")
            .field("hash", &self.hash)
            .finish()
    }
}

/// Generate a new random refresh token and its digest.
pub fn generate_refresh_token() -> GeneratedRefreshToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_refresh_token(&plaintext);
    GeneratedRefreshToken { plaintext, hash }
}
