//! Translation of `sqlx` failures into [`StoreError`].

use warden_core::error::StoreError;

/// Unique constraint guarding refresh token hashes.
pub const SESSION_HASH_CONSTRAINT: &str = "uq_user_sessions_refresh_token_hash";

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a sqlx error.
///
/// - A unique violation on [`SESSION_HASH_CONSTRAINT`] is a hash collision.
/// - Any other unique violation is a conflict naming the constraint.
/// - Everything else means the store is unavailable; the detail is logged
///   here and carried along for the internal error message.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return match db_err.constraint() {
                Some(SESSION_HASH_CONSTRAINT) => StoreError::HashCollision,
                Some(constraint) => {
                    StoreError::Conflict(format!("unique constraint {constraint} violated"))
                }
                None => StoreError::Conflict("unique constraint violated".into()),
            };
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Unavailable(err.to_string())
}
