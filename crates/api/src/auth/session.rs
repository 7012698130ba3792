//! Session service: the single owner of session creation, refresh,
//! revocation and per-user cap enforcement.
//!
//! Refresh tokens are reused across refreshes until the session is revoked
//! or its refresh window ends; they are not rotated on every refresh. A
//! token whose session is revoked or refresh-expired never works again.

use std::sync::Arc;

use warden_core::error::CoreError;
use warden_core::hashing::hash_refresh_token;
use warden_core::session::{ClientMetadata, NewSession, Session, SessionConfig, SessionStore};
use warden_core::tokens::generate_refresh_token;
use warden_core::types::{system_clock, Clock, DbId, SessionId, Timestamp};
use warden_core::user::UserDirectory;

use crate::auth::jwt::{AccessTokenIssuer, IssuedAccessToken};

/// Outcome of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: IssuedAccessToken,
    /// The (reused) raw refresh token.
    pub refresh_token: String,
    pub session: Session,
}

/// Why a refresh token was turned away. Only ever logged; callers see
/// [`CoreError::InvalidOrExpiredToken`] for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Unknown,
    Expired,
    UserUnavailable,
    RevokedConcurrently,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::Unknown => "unknown",
            Rejection::Expired => "expired",
            Rejection::UserUnavailable => "user_unavailable",
            Rejection::RevokedConcurrently => "revoked_concurrently",
        }
    }
}

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    issuer: Arc<AccessTokenIssuer>,
    config: SessionConfig,
    clock: Clock,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        issuer: Arc<AccessTokenIssuer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            users,
            issuer,
            config,
            clock: system_clock(),
        }
    }

    /// Replace the wall clock, e.g. to step across expiry boundaries.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// Open a session for an already authenticated, enabled user.
    ///
    /// Evicts the user's oldest active session(s) when the cap is reached,
    /// then stores the hash of a new refresh token. Returns the raw refresh
    /// token; this is the only place it exists outside the client.
    pub async fn register_login(
        &self,
        user_id: DbId,
        client: ClientMetadata,
        access_expires_at: Timestamp,
    ) -> Result<String, CoreError> {
        let now = self.now();
        let refresh = generate_refresh_token();
        let refresh_expires_at = self.config.refresh_expiry(now)?;

        let new = NewSession::new(
            user_id,
            &refresh.hash,
            access_expires_at,
            refresh_expires_at,
            client,
            now,
        )?;

        let insertion = self
            .store
            .insert_evicting(new, self.config.max_sessions)
            .await?;

        for evicted in &insertion.evicted {
            tracing::info!(user_id, session_id = %evicted, "Session evicted");
        }
        tracing::info!(
            user_id,
            session_id = %insertion.session.id,
            refresh_expires_at = %insertion.session.refresh_expires_at,
            "Session created"
        );

        Ok(refresh.plaintext)
    }

    /// Look up the active session for a raw refresh token. Does not mutate.
    ///
    /// Revoked sessions are never returned, so a match against one is
    /// indistinguishable from an unknown token.
    pub async fn validate_refresh_token(&self, raw: &str) -> Result<Option<Session>, CoreError> {
        let hash = hash_refresh_token(raw);
        Ok(self.store.find_active_by_hash(&hash).await?)
    }

    /// Mint a new access token for the session behind `raw`.
    pub async fn refresh_access_token(
        &self,
        raw: &str,
        client: &ClientMetadata,
    ) -> Result<RefreshedTokens, CoreError> {
        let now = self.now();

        let Some(session) = self.validate_refresh_token(raw).await? else {
            return Err(reject(None, Rejection::Unknown));
        };

        if session.is_refresh_expired(now) {
            self.store.revoke(session.id, now).await?;
            return Err(reject(Some(&session), Rejection::Expired));
        }

        let user = match self.users.find_by_id(session.user_id).await? {
            Some(user) if user.enabled => user,
            _ => {
                self.store.revoke(session.id, now).await?;
                return Err(reject(Some(&session), Rejection::UserUnavailable));
            }
        };

        let access_expires_at = self.config.access_expiry(now)?;
        let access_token = self
            .issuer
            .issue(user.id, &user.email, &user.roles, now, access_expires_at)
            .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;

        let Some(updated) = self
            .store
            .extend_access(session.id, access_expires_at, now)
            .await?
        else {
            return Err(reject(Some(&session), Rejection::RevokedConcurrently));
        };

        tracing::info!(
            user_id = updated.user_id,
            session_id = %updated.id,
            ip = client.ip.as_deref().unwrap_or("-"),
            user_agent = client.user_agent.as_deref().unwrap_or("-"),
            "Session refreshed"
        );

        Ok(RefreshedTokens {
            access_token,
            refresh_token: raw.to_string(),
            session: updated,
        })
    }

    /// Revoke the session behind `raw`. `false` means the token is unknown,
    /// already revoked, or refresh-expired; the latter is revoked anyway.
    pub async fn revoke_refresh_token(&self, raw: &str) -> Result<bool, CoreError> {
        let now = self.now();
        let hash = hash_refresh_token(raw);

        match self.store.revoke_active_by_hash(&hash, now).await? {
            Some(session) if !session.is_refresh_expired(now) => {
                tracing::info!(user_id = session.user_id, session_id = %session.id, "Session revoked");
                Ok(true)
            }
            Some(session) => {
                log_rejection(Some(&session), Rejection::Expired);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// The user's usable sessions, oldest first.
    pub async fn list_active_sessions(&self, user_id: DbId) -> Result<Vec<Session>, CoreError> {
        let now = self.now();
        let sessions = self.store.list_active_for_user(user_id).await?;
        Ok(sessions.into_iter().filter(|s| s.can_refresh(now)).collect())
    }

    /// Revoke one of the user's own sessions by id.
    ///
    /// Returns `false` when no such session belongs to the user. Revoking an
    /// already revoked session of the user is a successful no-op.
    pub async fn revoke_session(&self, user_id: DbId, id: SessionId) -> Result<bool, CoreError> {
        match self.store.find_by_id(id).await? {
            Some(session) if session.user_id == user_id => {
                if self.store.revoke(id, self.now()).await?.is_some() {
                    tracing::info!(user_id, session_id = %id, "Session revoked");
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Revoke every active session of the user.
    pub async fn revoke_all(&self, user_id: DbId) -> Result<u64, CoreError> {
        let revoked = self.store.revoke_all_for_user(user_id, self.now()).await?;
        tracing::info!(user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    pub async fn health_check(&self) -> Result<(), CoreError> {
        Ok(self.store.health_check().await?)
    }
}

fn reject(session: Option<&Session>, reason: Rejection) -> CoreError {
    log_rejection(session, reason);
    CoreError::InvalidOrExpiredToken
}

fn log_rejection(session: Option<&Session>, reason: Rejection) {
    match session {
        Some(session) => tracing::debug!(
            user_id = session.user_id,
            session_id = %session.id,
            reason = reason.as_str(),
            "Refresh token rejected"
        ),
        None => tracing::debug!(reason = reason.as_str(), "Refresh token rejected"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use warden_core::hashing::hash_refresh_token;
    use warden_core::user::NewUser;
    use warden_db::memory::{MemorySessionStore, MemoryUserDirectory};

    use super::*;

    /// A clock that only moves when told to.
    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<Timestamp>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Utc::now())))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }

        fn clock(&self) -> Clock {
            let inner = Arc::clone(&self.0);
            Arc::new(move || *inner.lock().unwrap())
        }
    }

    struct Fixture {
        service: SessionService,
        store: Arc<MemorySessionStore>,
        users: Arc<MemoryUserDirectory>,
        clock: ManualClock,
        user_id: DbId,
    }

    async fn fixture(max_sessions: usize) -> Fixture {
        let store = Arc::new(MemorySessionStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let user = users
            .create(NewUser::new("pat@example.com", "hash".into(), "Pat", "P", &["PATIENT"]).unwrap())
            .await
            .unwrap();
        let clock = ManualClock::new();
        let config = SessionConfig {
            max_sessions,
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        };
        let service = SessionService::new(
            store.clone(),
            users.clone(),
            Arc::new(AccessTokenIssuer::new("session-service-test-secret")),
            config,
        )
        .with_clock(clock.clock());

        Fixture {
            service,
            store,
            users,
            clock,
            user_id: user.id,
        }
    }

    impl Fixture {
        async fn login(&self) -> String {
            let access_expires_at = self.service.now() + Duration::minutes(15);
            let token = self
                .service
                .register_login(
                    self.user_id,
                    ClientMetadata::new(Some("10.0.0.1"), Some("test-agent")),
                    access_expires_at,
                )
                .await
                .expect("login should register a session");
            self.clock.advance(Duration::seconds(1));
            token
        }

        async fn session_for(&self, raw: &str) -> Session {
            let hash = hash_refresh_token(raw);
            let all = self.store.list_active_for_user(self.user_id).await.unwrap();
            if let Some(found) = all.into_iter().find(|s| s.refresh_token_hash == hash) {
                return found;
            }
            panic!("no active session for token");
        }
    }

    #[tokio::test]
    async fn raw_token_hashes_to_stored_hash() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let session = fx.session_for(&raw).await;

        assert_eq!(session.refresh_token_hash, hash_refresh_token(&raw));
        assert_ne!(session.refresh_token_hash, raw);
        assert!(session.refresh_expires_at >= session.access_expires_at);
        assert_eq!(session.ip.as_deref(), Some("10.0.0.1"));

        let other = fx.login().await;
        assert_ne!(fx.session_for(&other).await.refresh_token_hash, session.refresh_token_hash);
    }

    #[tokio::test]
    async fn three_logins_with_cap_two_revoke_the_first() {
        let fx = fixture(2).await;
        let first = fx.login().await;
        let first_id = fx.session_for(&first).await.id;
        let second = fx.login().await;
        let third = fx.login().await;

        let active = fx.store.list_active_for_user(fx.user_id).await.unwrap();
        assert_eq!(active.len(), 2);

        let evicted = fx.store.find_by_id(first_id).await.unwrap().unwrap();
        assert!(!evicted.active);
        assert!(evicted.revoked_at.is_some());

        assert!(fx.service.validate_refresh_token(&first).await.unwrap().is_none());
        assert!(fx.service.validate_refresh_token(&second).await.unwrap().is_some());
        assert!(fx.service.validate_refresh_token(&third).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cap_is_never_exceeded() {
        let fx = fixture(3).await;
        for _ in 0..10 {
            fx.login().await;
            let active = fx.store.list_active_for_user(fx.user_id).await.unwrap();
            assert!(active.len() <= 3);
        }
    }

    #[tokio::test]
    async fn concurrent_logins_respect_cap() {
        let fx = Arc::new(fixture(2).await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let fx = Arc::clone(&fx);
            handles.push(tokio::spawn(async move {
                let exp = fx.service.now() + Duration::minutes(15);
                fx.service
                    .register_login(fx.user_id, ClientMetadata::default(), exp)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let active = fx.store.list_active_for_user(fx.user_id).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(fx.store.len().await, 8);
    }

    #[tokio::test]
    async fn refresh_bumps_access_and_keeps_refresh_expiry() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let before = fx.session_for(&raw).await;

        fx.clock.advance(Duration::minutes(20));
        let now = fx.service.now();
        let refreshed = fx
            .service
            .refresh_access_token(&raw, &ClientMetadata::default())
            .await
            .unwrap();

        assert!(refreshed.access_token.expires_at > now);
        assert_eq!(refreshed.session.access_expires_at, refreshed.access_token.expires_at);
        assert_eq!(refreshed.session.refresh_expires_at, before.refresh_expires_at);
        assert_eq!(refreshed.session.updated_at, now);
        assert_eq!(refreshed.refresh_token, raw, "refresh token is reused");
    }

    #[tokio::test]
    async fn refreshed_access_token_carries_identity() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let refreshed = fx
            .service
            .refresh_access_token(&raw, &ClientMetadata::default())
            .await
            .unwrap();

        let claims = AccessTokenIssuer::new("session-service-test-secret")
            .verify(&refreshed.access_token.token)
            .unwrap();
        assert_eq!(claims.sub, fx.user_id);
        assert_eq!(claims.email, "pat@example.com");
        assert_eq!(claims.roles, vec!["PATIENT".to_string()]);
    }

    #[tokio::test]
    async fn refresh_then_logout_then_refresh_fails() {
        let fx = fixture(5).await;
        let raw = fx.login().await;

        fx.service
            .refresh_access_token(&raw, &ClientMetadata::default())
            .await
            .unwrap();
        assert!(fx.service.revoke_refresh_token(&raw).await.unwrap());

        for _ in 0..3 {
            assert_matches!(
                fx.service.refresh_access_token(&raw, &ClientMetadata::default()).await,
                Err(CoreError::InvalidOrExpiredToken)
            );
            assert!(!fx.service.revoke_refresh_token(&raw).await.unwrap());
        }
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let tampered = format!("{raw}x");

        assert_matches!(
            fx.service.refresh_access_token(&tampered, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
        assert!(!fx.service.revoke_refresh_token(&tampered).await.unwrap());
        assert!(fx.service.validate_refresh_token(&raw).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn already_expired_active_session_cannot_refresh() {
        let fx = fixture(5).await;
        let now = fx.service.now();
        let raw = "manually-inserted-refresh-token";
        let new = NewSession::new(
            fx.user_id,
            &hash_refresh_token(raw),
            now - Duration::minutes(10),
            now - Duration::seconds(1),
            ClientMetadata::default(),
            now - Duration::days(7),
        )
        .unwrap();
        let inserted = fx.store.insert_evicting(new, 5).await.unwrap();
        assert!(inserted.session.active);

        assert_matches!(
            fx.service.refresh_access_token(raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
        // Dead tokens stay dead.
        let stored = fx.store.find_by_id(inserted.session.id).await.unwrap().unwrap();
        assert!(!stored.active);
        assert_matches!(
            fx.service.refresh_access_token(raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn refresh_window_passing_kills_token() {
        let fx = fixture(5).await;
        let raw = fx.login().await;

        fx.clock.advance(Duration::days(7));
        assert_matches!(
            fx.service.refresh_access_token(&raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
        assert!(!fx.service.revoke_refresh_token(&raw).await.unwrap());
    }

    #[tokio::test]
    async fn logout_of_expired_token_is_false() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let id = fx.session_for(&raw).await.id;

        fx.clock.advance(Duration::days(8));
        assert!(!fx.service.revoke_refresh_token(&raw).await.unwrap());
        assert!(!fx.store.find_by_id(id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn disabled_user_cannot_refresh() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        fx.users.set_enabled(fx.user_id, false).await;

        assert_matches!(
            fx.service.refresh_access_token(&raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
        fx.users.set_enabled(fx.user_id, true).await;
        assert_matches!(
            fx.service.refresh_access_token(&raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn concurrent_refresh_and_logout_leave_token_dead() {
        let fx = Arc::new(fixture(5).await);
        let raw = fx.login().await;

        let refresher = {
            let fx = Arc::clone(&fx);
            let raw = raw.clone();
            tokio::spawn(async move {
                fx.service
                    .refresh_access_token(&raw, &ClientMetadata::default())
                    .await
            })
        };
        let logout = {
            let fx = Arc::clone(&fx);
            let raw = raw.clone();
            tokio::spawn(async move { fx.service.revoke_refresh_token(&raw).await })
        };

        let _ = refresher.await.unwrap();
        assert!(logout.await.unwrap().unwrap());
        assert_matches!(
            fx.service.refresh_access_token(&raw, &ClientMetadata::default()).await,
            Err(CoreError::InvalidOrExpiredToken)
        );
    }

    #[tokio::test]
    async fn revoke_keeps_first_revoked_at() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let id = fx.session_for(&raw).await.id;

        assert!(fx.service.revoke_session(fx.user_id, id).await.unwrap());
        let first = fx.store.find_by_id(id).await.unwrap().unwrap().revoked_at;

        fx.clock.advance(Duration::minutes(1));
        assert!(fx.service.revoke_session(fx.user_id, id).await.unwrap());
        let second = fx.store.find_by_id(id).await.unwrap().unwrap().revoked_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn revoke_session_of_another_user_is_not_found() {
        let fx = fixture(5).await;
        let raw = fx.login().await;
        let id = fx.session_for(&raw).await.id;

        assert!(!fx.service.revoke_session(fx.user_id + 1, id).await.unwrap());
        assert!(fx.service.validate_refresh_token(&raw).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_and_revoke_all() {
        let fx = fixture(5).await;
        fx.login().await;
        fx.login().await;
        fx.login().await;

        let listed = fx.service.list_active_sessions(fx.user_id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        assert_eq!(fx.service.revoke_all(fx.user_id).await.unwrap(), 3);
        assert!(fx.service.list_active_sessions(fx.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_hides_refresh_expired_sessions() {
        let fx = fixture(5).await;
        fx.login().await;
        fx.clock.advance(Duration::days(7));
        assert!(fx.service.list_active_sessions(fx.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_refresh_ttl_is_an_error_not_a_panic() {
        let fx = fixture(5).await;
        let service = SessionService::new(
            fx.store.clone(),
            fx.users.clone(),
            Arc::new(AccessTokenIssuer::new("session-service-test-secret")),
            SessionConfig {
                max_sessions: 5,
                access_ttl: Duration::minutes(15),
                refresh_ttl: Duration::seconds(10_000_000_000_000),
            },
        );

        let result = service
            .register_login(fx.user_id, ClientMetadata::default(), service.now())
            .await;
        assert_matches!(result, Err(CoreError::Internal(_)));
        assert!(fx.store.list_active_for_user(fx.user_id).await.unwrap().is_empty());
    }
}
