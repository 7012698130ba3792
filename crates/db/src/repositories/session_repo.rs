//! Repository for the `user_sessions` table.

use sqlx::PgExecutor;
use warden_core::session::NewSession;
use warden_core::types::{DbId, SessionId, Timestamp};

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, refresh_token_hash, access_expires_at, refresh_expires_at, \
                       is_active, revoked_at, ip, user_agent, created_at, updated_at";

/// Provides the session queries used by the lifecycle store.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new active session, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        id: SessionId,
        input: &NewSession,
    ) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions
                (id, user_id, refresh_token_hash, access_expires_at, refresh_expires_at,
                 is_active, ip, user_agent, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.access_expires_at)
            .bind(input.refresh_expires_at)
            .bind(&input.client.ip)
            .bind(&input.client.user_agent)
            .bind(input.created_at)
            .fetch_one(executor)
            .await
    }

    /// Find a session by id regardless of state.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: SessionId,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an active session by its refresh token hash.
    ///
    /// Expiry is not filtered here; callers decide what an expired but
    /// active session means.
    pub async fn find_active_by_hash<'e, E: PgExecutor<'e>>(
        executor: E,
        hash: &str,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1 AND is_active"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(hash)
            .fetch_optional(executor)
            .await
    }

    /// List a user's active sessions, oldest first.
    pub async fn list_active_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1 AND is_active
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Bump `access_expires_at` on a session that is still refreshable.
    pub async fn extend_access<'e, E: PgExecutor<'e>>(
        executor: E,
        id: SessionId,
        access_expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions
             SET access_expires_at = $2, updated_at = $3
             WHERE id = $1 AND is_active AND refresh_expires_at > $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(access_expires_at)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Revoke a single active session. Returns the row only if it changed.
    pub async fn revoke<'e, E: PgExecutor<'e>>(
        executor: E,
        id: SessionId,
        now: Timestamp,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions
             SET is_active = FALSE, revoked_at = $2, updated_at = $2
             WHERE id = $1 AND is_active
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Revoke the active session carrying `hash`. Returns the row only if it changed.
    pub async fn revoke_active_by_hash<'e, E: PgExecutor<'e>>(
        executor: E,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions
             SET is_active = FALSE, revoked_at = $2, updated_at = $2
             WHERE refresh_token_hash = $1 AND is_active
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(hash)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Revoke all active sessions for a user. Returns the count of revoked sessions.
    pub async fn revoke_all_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions
             SET is_active = FALSE, revoked_at = $2, updated_at = $2
             WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
