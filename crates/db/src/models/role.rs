//! Role row with its aggregated permission names.

use sqlx::FromRow;
use warden_core::types::DbId;
use warden_core::user::Role;

/// A `roles` row joined with `role_permissions`/`permissions`.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: DbId,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            permissions: row.permissions,
        }
    }
}
