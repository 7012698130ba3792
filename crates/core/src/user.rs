//! User and role model plus the directory contracts the auth flow consumes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{CoreError, StoreError};
use crate::roles::normalize_role_name;
use crate::types::{DbId, Timestamp};

/// A user as returned by the directory.
///
/// Contains the password hash -- never serialize this to API responses.
#[derive(Debug, Clone)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    /// Role names, upper-case.
    pub roles: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A validated user that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl NewUser {
    /// Normalize email (trim, lower-case), names (trim) and role names.
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
        roles: &[&str],
    ) -> Result<Self, CoreError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(CoreError::Validation("email must not be empty".into()));
        }
        if password_hash.is_empty() {
            return Err(CoreError::Validation("password hash must not be empty".into()));
        }
        Ok(Self {
            email,
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            roles: roles.iter().map(|r| normalize_role_name(r)).collect(),
        })
    }
}

/// Canonical email form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A role and the permissions it grants.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(id: DbId, name: &str, permissions: &[&str]) -> Self {
        let mut permissions: Vec<String> =
            permissions.iter().map(|p| normalize_role_name(p)).collect();
        permissions.sort();
        permissions.dedup();
        Self {
            id,
            name: normalize_role_name(name),
            permissions,
        }
    }
}

/// Lookup and creation of users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Lookup by email; implementations normalize the argument first.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Persist a user. A taken email is a [`StoreError::Conflict`]; role
    /// names must already exist in the [`RoleStore`].
    async fn create(&self, input: NewUser) -> Result<User, StoreError>;
}

/// Read access to roles, plus creation for seeding.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// All roles ordered by id.
    async fn list(&self) -> Result<Vec<Role>, StoreError>;

    /// Insert the role if missing and grant the given permissions.
    async fn ensure(&self, name: &str, permissions: &[&str]) -> Result<Role, StoreError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn new_user_normalizes_fields() {
        let user = NewUser::new(
            "  Alice@Example.COM ",
            "$argon2id$hash".into(),
            " Alice ",
            " Liddell",
            &["patient"],
        )
        .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.first_name, "Alice");
        assert_eq!(user.last_name, "Liddell");
        assert_eq!(user.roles, vec!["PATIENT".to_string()]);
    }

    #[test]
    fn new_user_requires_email() {
        assert_matches!(
            NewUser::new("   ", "h".into(), "a", "b", &[]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn role_names_and_permissions_are_upper_case() {
        let role = Role::new(1, " attendant ", &["patient_read", "PATIENT_READ"]);
        assert_eq!(role.name, "ATTENDANT");
        assert_eq!(role.permissions, vec!["PATIENT_READ".to_string()]);
    }
}
