//! PostgreSQL implementations of the core store traits.

use async_trait::async_trait;
use uuid::Uuid;
use warden_core::error::StoreError;
use warden_core::roles::normalize_role_name;
use warden_core::session::{eviction_victims, Insertion, NewSession, Session, SessionStore};
use warden_core::types::{DbId, SessionId, Timestamp};
use warden_core::user::{normalize_email, NewUser, Role, RoleStore, User, UserDirectory};

use crate::error::map_sqlx_error;
use crate::repositories::{RoleRepo, SessionRepo, UserRepo};
use crate::DbPool;

/// Session store backed by the `user_sessions` table.
///
/// Cap eviction runs inside a transaction holding a row lock on the owning
/// user, so concurrent logins for the same user are serialized while other
/// users proceed independently. All other mutations are single conditional
/// `UPDATE ... RETURNING` statements.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_evicting(
        &self,
        new: NewSession,
        max_active: usize,
    ) -> Result<Insertion, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        if !UserRepo::lock_for_update(&mut *tx, new.user_id)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(StoreError::UnknownUser(new.user_id));
        }

        let active: Vec<Session> = SessionRepo::list_active_for_user(&mut *tx, new.user_id)
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Session::from)
            .collect();

        let mut evicted = Vec::new();
        for id in eviction_victims(&active, max_active) {
            if SessionRepo::revoke(&mut *tx, id, new.created_at)
                .await
                .map_err(map_sqlx_error)?
                .is_some()
            {
                evicted.push(id);
            }
        }

        let session = SessionRepo::create(&mut *tx, Uuid::new_v4(), &new)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Insertion {
            session: session.into(),
            evicted,
        })
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Session::from))
    }

    async fn find_active_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError> {
        let row = SessionRepo::find_active_by_hash(&self.pool, hash)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Session::from))
    }

    async fn list_active_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        let rows = SessionRepo::list_active_for_user(&self.pool, user_id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn extend_access(
        &self,
        id: SessionId,
        access_expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let row = SessionRepo::extend_access(&self.pool, id, access_expires_at, now)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Session::from))
    }

    async fn revoke(&self, id: SessionId, now: Timestamp) -> Result<Option<Session>, StoreError> {
        let row = SessionRepo::revoke(&self.pool, id, now)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Session::from))
    }

    async fn revoke_active_by_hash(
        &self,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let row = SessionRepo::revoke_active_by_hash(&self.pool, hash, now)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Session::from))
    }

    async fn revoke_all_for_user(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError> {
        SessionRepo::revoke_all_for_user(&self.pool, user_id, now)
            .await
            .map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// User directory backed by the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        let row = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = UserRepo::find_by_email(&self.pool, &normalize_email(email))
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(User::from))
    }

    async fn create(&self, input: NewUser) -> Result<User, StoreError> {
        let row = UserRepo::create(&self.pool, &input)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

/// Role store backed by the `roles` table.
#[derive(Clone)]
pub struct PgRoleStore {
    pool: DbPool,
}

impl PgRoleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let row = RoleRepo::find_by_name(&self.pool, &normalize_role_name(name))
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Role::from))
    }

    async fn list(&self) -> Result<Vec<Role>, StoreError> {
        let rows = RoleRepo::list(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn ensure(&self, name: &str, permissions: &[&str]) -> Result<Role, StoreError> {
        let permissions: Vec<String> = permissions.iter().map(|p| normalize_role_name(p)).collect();
        let row = RoleRepo::ensure(&self.pool, &normalize_role_name(name), &permissions)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
