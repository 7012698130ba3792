//! Repository for the `roles` and `permissions` tables.

use sqlx::{PgExecutor, PgPool};

use crate::models::role::RoleRow;

/// Role columns plus aggregated permission names.
const SELECT_ROLE: &str = "SELECT r.id, r.name, \
        COALESCE(ARRAY_AGG(p.name ORDER BY p.name) FILTER (WHERE p.name IS NOT NULL), '{}') AS permissions \
     FROM roles r \
     LEFT JOIN role_permissions rp ON rp.role_id = r.id \
     LEFT JOIN permissions p ON p.id = rp.permission_id";

/// Provides role lookups and seeding.
pub struct RoleRepo;

impl RoleRepo {
    /// Find a role by (already normalized) name.
    pub async fn find_by_name<'e, E: PgExecutor<'e>>(
        executor: E,
        name: &str,
    ) -> Result<Option<RoleRow>, sqlx::Error> {
        let query = format!("{SELECT_ROLE} WHERE r.name = $1 GROUP BY r.id");
        sqlx::query_as::<_, RoleRow>(&query)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// List all roles ordered by ID ascending.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<RoleRow>, sqlx::Error> {
        let query = format!("{SELECT_ROLE} GROUP BY r.id ORDER BY r.id ASC");
        sqlx::query_as::<_, RoleRow>(&query).fetch_all(executor).await
    }

    /// Create the role and permissions if missing and link them.
    pub async fn ensure(
        pool: &PgPool,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO permissions (name) SELECT UNNEST($1::TEXT[])
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(permissions)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id)
             SELECT r.id, p.id FROM roles r, permissions p
             WHERE r.name = $1 AND p.name = ANY($2)
             ON CONFLICT DO NOTHING",
        )
        .bind(name)
        .bind(permissions)
        .execute(&mut *tx)
        .await?;

        let role = Self::find_by_name(&mut *tx, name)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        tx.commit().await?;
        Ok(role)
    }
}
