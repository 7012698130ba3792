//! SHA-256 hex digests for refresh tokens.
//!
//! Refresh tokens are only ever persisted as their digest, so a leaked
//! session table cannot be replayed.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest of a raw refresh token as stored in `refresh_token_hash`.
pub fn hash_refresh_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}
