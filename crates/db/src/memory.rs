//! In-process stores.
//!
//! Used when the server runs without `DATABASE_URL` and by the test suites.
//! Each store keeps its state behind a single `tokio::sync::Mutex`, so every
//! trait method is one critical section and therefore atomic with respect to
//! every other call on the same store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;
use warden_core::error::StoreError;
use warden_core::roles::normalize_role_name;
use warden_core::session::{eviction_victims, Insertion, NewSession, Session, SessionStore};
use warden_core::types::{DbId, SessionId, Timestamp};
use warden_core::user::{normalize_email, NewUser, Role, RoleStore, User, UserDirectory};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, active or not.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_evicting(
        &self,
        new: NewSession,
        max_active: usize,
    ) -> Result<Insertion, StoreError> {
        let mut sessions = self.sessions.lock().await;

        if sessions
            .values()
            .any(|s| s.refresh_token_hash == new.refresh_token_hash)
        {
            return Err(StoreError::HashCollision);
        }

        let active: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == new.user_id && s.active)
            .cloned()
            .collect();

        let now = new.created_at;
        let mut evicted = Vec::new();
        for id in eviction_victims(&active, max_active) {
            if let Some(victim) = sessions.get_mut(&id) {
                if victim.revoke(now) {
                    evicted.push(id);
                }
            }
        }

        let session = new.into_session(Uuid::new_v4());
        sessions.insert(session.id, session.clone());

        Ok(Insertion { session, evicted })
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.lock().await.get(&id).cloned())
    }

    async fn find_active_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .find(|s| s.active && s.refresh_token_hash == hash)
            .cloned())
    }

    async fn list_active_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        let mut active: Vec<Session> = self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn extend_access(
        &self,
        id: SessionId,
        access_expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&id) {
            Some(session) if session.can_refresh(now) => {
                session.extend_access(access_expires_at, now);
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn revoke(&self, id: SessionId, now: Timestamp) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&id) {
            Some(session) => Ok(session.revoke(now).then(|| session.clone())),
            None => Ok(None),
        }
    }

    async fn revoke_active_by_hash(
        &self,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let found = sessions
            .values_mut()
            .find(|s| s.active && s.refresh_token_hash == hash);
        match found {
            Some(session) => Ok(session.revoke(now).then(|| session.clone())),
            None => Ok(None),
        }
    }

    async fn revoke_all_for_user(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let revoked = sessions
            .values_mut()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| s.revoke(now).then_some(()))
            .count();
        Ok(revoked as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
struct UserTable {
    next_id: DbId,
    users: Vec<User>,
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    table: Mutex<UserTable>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the `enabled` flag. Returns `false` if the user does not exist.
    pub async fn set_enabled(&self, id: DbId, enabled: bool) -> bool {
        let mut table = self.table.lock().await;
        match table.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.enabled = enabled;
                user.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        let table = self.table.lock().await;
        Ok(table.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let table = self.table.lock().await;
        Ok(table.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, input: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.lock().await;
        if table.users.iter().any(|u| u.email == input.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                input.email
            )));
        }

        table.next_id += 1;
        let now = chrono::Utc::now();
        let mut roles = input.roles;
        roles.sort();
        roles.dedup();
        let user = User {
            id: table.next_id,
            email: input.email,
            password_hash: input.password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            enabled: true,
            roles,
            created_at: now,
            updated_at: now,
        };
        table.users.push(user.clone());
        Ok(user)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRoleStore {
    roles: Mutex<Vec<Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let name = normalize_role_name(name);
        let roles = self.roles.lock().await;
        Ok(roles.iter().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.roles.lock().await.clone())
    }

    async fn ensure(&self, name: &str, permissions: &[&str]) -> Result<Role, StoreError> {
        let mut roles = self.roles.lock().await;
        let next_id = roles.len() as DbId + 1;
        let wanted = Role::new(next_id, name, permissions);

        if let Some(existing) = roles.iter_mut().find(|r| r.name == wanted.name) {
            existing.permissions.extend(wanted.permissions);
            existing.permissions.sort();
            existing.permissions.dedup();
            return Ok(existing.clone());
        }

        roles.push(wanted.clone());
        Ok(wanted)
    }
}
