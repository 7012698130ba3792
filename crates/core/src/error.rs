use crate::types::DbId;

/// Domain-level error taxonomy shared by every layer.
///
/// Authentication failures are deliberately coarse: `InvalidCredentials`
/// covers both unknown emails and wrong passwords, and
/// `InvalidOrExpiredToken` covers unknown, revoked, expired and tampered
/// refresh tokens, so responses never reveal whether an account or session
/// exists.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors reported by [`SessionStore`](crate::session::SessionStore),
/// [`UserDirectory`](crate::user::UserDirectory) and
/// [`RoleStore`](crate::user::RoleStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Two sessions ended up with the same refresh token hash.
    #[error("refresh token hash collision")]
    HashCollision,

    /// A uniqueness constraint other than the refresh hash was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A session was inserted for a user that does not exist.
    #[error("user {0} does not exist")]
    UnknownUser(DbId),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CoreError::StorageUnavailable(msg),
            StoreError::HashCollision => {
                CoreError::Internal("refresh token hash collision".into())
            }
            StoreError::Conflict(msg) => CoreError::DuplicateUser(msg),
            StoreError::UnknownUser(id) => CoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            },
        }
    }
}
