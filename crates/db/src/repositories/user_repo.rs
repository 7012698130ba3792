//! Repository for the `users` and `user_roles` tables.

use sqlx::{PgExecutor, PgPool};
use warden_core::types::DbId;
use warden_core::user::NewUser;

use crate::models::user::UserRow;

/// User columns plus aggregated role names.
const SELECT_USER: &str = "SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, \
        u.enabled, u.created_at, u.updated_at, \
        COALESCE(ARRAY_AGG(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles \
     FROM users u \
     LEFT JOIN user_roles ur ON ur.user_id = u.id \
     LEFT JOIN roles r ON r.id = ur.role_id";

/// Provides the user directory queries.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and assign the named roles in one transaction.
    ///
    /// Role names that do not exist are silently skipped; callers check
    /// them against the role store beforehand.
    pub async fn create(pool: &PgPool, input: &NewUser) -> Result<UserRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash, first_name, last_name)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = ANY($2)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&input.roles)
        .execute(&mut *tx)
        .await?;

        let query = format!("{SELECT_USER} WHERE u.id = $1 GROUP BY u.id");
        let user = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Find a user by internal ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("{SELECT_USER} WHERE u.id = $1 GROUP BY u.id");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by (already normalized) email.
    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("{SELECT_USER} WHERE u.email = $1 GROUP BY u.id");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Take a row lock on the user, serializing session bookkeeping for
    /// that user until the surrounding transaction ends.
    ///
    /// Returns `false` if the user does not exist.
    pub async fn lock_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }
}
