//! Session model, lifecycle policy and the session store contract.
//!
//! A session binds the SHA-256 digest of an opaque refresh token to a user
//! and a validity window. Sessions move `ACTIVE -> REVOKED` exactly once and
//! are never deleted by the lifecycle code. Refresh expiry is a computed
//! predicate rather than a stored state, so every consumer must go through
//! [`Session::can_refresh`].

use std::fmt;

use async_trait::async_trait;

use crate::error::{CoreError, StoreError};
use crate::hashing::SHA256_HEX_LEN;
use crate::types::{DbId, SessionId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of concurrently active sessions per user.
pub const DEFAULT_MAX_SESSIONS: usize = 5;

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Upper bound for either token lifetime (one year).
pub const MAX_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Maximum stored length of the client IP.
pub const MAX_IP_LEN: usize = 64;

/// Maximum stored length of the client user agent.
pub const MAX_USER_AGENT_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Session cap and token lifetimes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            access_ttl: chrono::Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: chrono::Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }
}

impl SessionConfig {
    /// Reject configurations that would break the session invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_sessions == 0 {
            return Err(CoreError::Validation(
                "max_sessions must be at least 1".into(),
            ));
        }
        if self.access_ttl <= chrono::Duration::zero() {
            return Err(CoreError::Validation("access_ttl must be positive".into()));
        }
        if self.refresh_ttl < self.access_ttl {
            return Err(CoreError::Validation(
                "refresh_ttl must be at least access_ttl".into(),
            ));
        }
        if self.refresh_ttl > chrono::Duration::seconds(MAX_TTL_SECS) {
            return Err(CoreError::Validation(format!(
                "refresh_ttl must be at most {MAX_TTL_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// When an access token issued at `now` expires.
    pub fn access_expiry(&self, now: Timestamp) -> Result<Timestamp, CoreError> {
        expiry_after(now, self.access_ttl)
    }

    /// When a session opened at `now` stops being refreshable.
    pub fn refresh_expiry(&self, now: Timestamp) -> Result<Timestamp, CoreError> {
        expiry_after(now, self.refresh_ttl)
    }
}

fn expiry_after(now: Timestamp, ttl: chrono::Duration) -> Result<Timestamp, CoreError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| CoreError::Internal(format!("expiry overflows at {now} + {ttl}")))
}

// ---------------------------------------------------------------------------
// Client metadata
// ---------------------------------------------------------------------------

/// Descriptive metadata about the client that opened a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetadata {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMetadata {
    /// Normalize raw request values: trim both, lower-case the IP, drop
    /// empty values and cap lengths to the stored column sizes.
    ///
    /// The IP is lower-cased before truncation since lower-casing can grow it.
    pub fn new(ip: Option<&str>, user_agent: Option<&str>) -> Self {
        let ip = ip.map(str::to_lowercase);
        Self {
            ip: normalize_field(ip.as_deref(), MAX_IP_LEN),
            user_agent: normalize_field(user_agent, MAX_USER_AGENT_LEN),
        }
    }
}

fn normalize_field(value: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated device/client binding.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
    pub active: bool,
    pub revoked_at: Option<Timestamp>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// The hash is left out of debug output so sessions can be logged freely.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("active", &self.active)
            .field("revoked_at", &self.revoked_at)
            .field("ip", &self.ip)
            .field("user_agent", &self.user_agent)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Session {
    pub fn is_access_expired(&self, now: Timestamp) -> bool {
        self.access_expires_at <= now
    }

    pub fn is_refresh_expired(&self, now: Timestamp) -> bool {
        self.refresh_expires_at <= now
    }

    /// Active and not past its refresh expiry.
    pub fn can_refresh(&self, now: Timestamp) -> bool {
        self.active && !self.is_refresh_expired(now)
    }

    /// Transition to revoked. Returns `false` (and changes nothing) when the
    /// session was already revoked.
    pub fn revoke(&mut self, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.revoked_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Bump the access expiry after a successful refresh.
    pub fn extend_access(&mut self, access_expires_at: Timestamp, now: Timestamp) {
        self.access_expires_at = access_expires_at;
        self.updated_at = now;
    }
}

/// A validated, normalized session that has not been persisted yet.
#[derive(Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
    pub client: ClientMetadata,
    pub created_at: Timestamp,
}

impl fmt::Debug for NewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSession")
            .field("user_id", &self.user_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("client", &self.client)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl NewSession {
    /// Build a new session, checking the hash shape and that the refresh
    /// window covers the access window.
    pub fn new(
        user_id: DbId,
        refresh_token_hash: &str,
        access_expires_at: Timestamp,
        refresh_expires_at: Timestamp,
        client: ClientMetadata,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let refresh_token_hash = refresh_token_hash.trim().to_lowercase();
        if refresh_token_hash.len() != SHA256_HEX_LEN
            || !refresh_token_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(CoreError::Validation(
                "refresh_token_hash must be a SHA-256 hex digest".into(),
            ));
        }
        if refresh_expires_at < access_expires_at {
            return Err(CoreError::Validation(
                "refresh expiry must not precede access expiry".into(),
            ));
        }
        Ok(Self {
            user_id,
            refresh_token_hash,
            access_expires_at,
            refresh_expires_at,
            client,
            created_at: now,
        })
    }

    /// Materialize as an active session with the given id.
    pub fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            user_id: self.user_id,
            refresh_token_hash: self.refresh_token_hash,
            access_expires_at: self.access_expires_at,
            refresh_expires_at: self.refresh_expires_at,
            active: true,
            revoked_at: None,
            ip: self.client.ip,
            user_agent: self.client.user_agent,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Cap eviction policy
// ---------------------------------------------------------------------------

/// Pick the sessions to revoke before inserting one more for the same user.
///
/// `active` must contain only the user's active sessions. Oldest
/// `created_at` goes first, ties broken by id. Returns an empty list while
/// the user is under the cap; normally exactly one id once at the cap, more
/// only if the cap was lowered below the current count.
pub fn eviction_victims(active: &[Session], max_sessions: usize) -> Vec<SessionId> {
    let max_sessions = max_sessions.max(1);
    if active.len() < max_sessions {
        return Vec::new();
    }
    let surplus = active.len() + 1 - max_sessions;

    let mut ordered: Vec<&Session> = active.iter().filter(|s| s.active).collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    ordered.into_iter().take(surplus).map(|s| s.id).collect()
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Result of [`SessionStore::insert_evicting`].
#[derive(Debug, Clone)]
pub struct Insertion {
    pub session: Session,
    /// Sessions revoked by this call to make room under the cap.
    pub evicted: Vec<SessionId>,
}

/// Persistent collection of sessions.
///
/// Every method is one atomic unit: implementations must make sure that no
/// two concurrent calls interleave on the same session row, and that
/// [`insert_evicting`](Self::insert_evicting) is serialized per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Revoke the user's oldest active sessions as chosen by
    /// [`eviction_victims`], then insert `new` as an active session.
    async fn insert_evicting(
        &self,
        new: NewSession,
        max_active: usize,
    ) -> Result<Insertion, StoreError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Find an active session (expired or not) by refresh token hash.
    async fn find_active_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError>;

    /// All active sessions for a user, oldest first.
    async fn list_active_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError>;

    /// Set `access_expires_at` on a session that is still active and whose
    /// refresh expiry is after `now`. Returns `None` when no such session
    /// exists (revoked concurrently, expired, unknown).
    async fn extend_access(
        &self,
        id: SessionId,
        access_expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Revoke a session. Returns the revoked session only when this call
    /// performed the transition; an already revoked session yields `None`
    /// and keeps its original `revoked_at`.
    async fn revoke(&self, id: SessionId, now: Timestamp) -> Result<Option<Session>, StoreError>;

    /// Revoke the active session carrying `hash`, if any, returning it as
    /// it was revoked.
    async fn revoke_active_by_hash(
        &self,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Revoke every active session of a user. Returns how many were revoked.
    async fn revoke_all_for_user(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError>;

    /// Cheap liveness probe for the health endpoint.
    async fn health_check(&self) -> Result<(), StoreError>;
}
