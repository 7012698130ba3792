//! Login, registration, refresh and logout, composed from the user
//! directory, role store, password verifier, access-token issuer and
//! [`SessionService`].
//!
//! Identity is always passed in explicitly by the caller (see
//! [`AuthUser`](crate::middleware::auth::AuthUser)); nothing here reads an
//! ambient security context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warden_core::error::CoreError;
use warden_core::roles::{registration_role, ROLE_PATIENT};
use warden_core::session::{ClientMetadata, Session};
use warden_core::types::{DbId, SessionId, Timestamp};
use warden_core::user::{normalize_email, NewUser, RoleStore, User, UserDirectory};

use crate::auth::jwt::AccessTokenIssuer;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionService;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/register`. `role` defaults to `PATIENT`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Request body for `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: DbId,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: DbId,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles: user.roles,
        }
    }
}

/// A session as shown to its owner. Never carries the token hash.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: Timestamp,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            access_expires_at: session.access_expires_at,
            refresh_expires_at: session.refresh_expires_at,
            ip: session.ip,
            user_agent: session.user_agent,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleStore>,
    issuer: Arc<AccessTokenIssuer>,
    sessions: SessionService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleStore>,
        issuer: Arc<AccessTokenIssuer>,
        sessions: SessionService,
    ) -> Self {
        Self {
            users,
            roles,
            issuer,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn issuer(&self) -> &AccessTokenIssuer {
        &self.issuer
    }

    /// Authenticate with email + password and open a new session.
    pub async fn login(
        &self,
        input: &LoginRequest,
        client: ClientMetadata,
    ) -> Result<LoginResponse, CoreError> {
        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or(CoreError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        // Checked after the password so it cannot be used to probe emails.
        if !user.enabled {
            return Err(CoreError::AccountDisabled);
        }

        let now = self.sessions.now();
        let access_ttl = self.sessions.config().access_ttl;
        let access_expires_at = self.sessions.config().access_expiry(now)?;
        let access = self
            .issuer
            .issue(user.id, &user.email, &user.roles, now, access_expires_at)
            .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;

        let refresh_token = self
            .sessions
            .register_login(user.id, client, access.expires_at)
            .await?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResponse {
            access_token: access.token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: access_ttl.num_seconds(),
            refresh_token,
            user: UserSummary {
                id: user.id,
                email: user.email,
                roles: user.roles,
            },
        })
    }

    /// Create a user with a single role.
    pub async fn register(&self, input: &RegisterRequest) -> Result<RegisterResponse, CoreError> {
        let role = registration_role(input.role.as_deref().unwrap_or(ROLE_PATIENT))?;
        if self.roles.find_by_name(role).await?.is_none() {
            return Err(CoreError::RoleNotFound(role.to_string()));
        }

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(CoreError::DuplicateUser(normalize_email(&input.email)));
        }

        let new_user = NewUser::new(
            &input.email,
            hash_password(&input.password)?,
            &input.first_name,
            &input.last_name,
            &[role],
        )?;
        let user = self.users.create(new_user).await?;

        tracing::info!(user_id = user.id, role, "User registered");

        Ok(RegisterResponse {
            id: user.id,
            email: user.email,
            message: "User registered successfully".to_string(),
        })
    }

    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientMetadata,
    ) -> Result<TokenRefreshResponse, CoreError> {
        let refreshed = self
            .sessions
            .refresh_access_token(refresh_token, client)
            .await?;

        Ok(TokenRefreshResponse {
            access_token: refreshed.access_token.token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: self.sessions.config().access_ttl.num_seconds(),
            refresh_token: refreshed.refresh_token,
        })
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), CoreError> {
        if self.sessions.revoke_refresh_token(refresh_token).await? {
            Ok(())
        } else {
            Err(CoreError::InvalidOrExpiredToken)
        }
    }

    /// All role names, ordered by id.
    pub async fn list_roles(&self) -> Result<Vec<String>, CoreError> {
        let roles = self.roles.list().await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    pub async fn profile(&self, user_id: DbId) -> Result<UserProfile, CoreError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| CoreError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }

    pub async fn list_sessions(&self, user_id: DbId) -> Result<Vec<SessionInfo>, CoreError> {
        let sessions = self.sessions.list_active_sessions(user_id).await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    pub async fn revoke_session(&self, user_id: DbId, id: SessionId) -> Result<(), CoreError> {
        if self.sessions.revoke_session(user_id, id).await? {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "session",
                id: id.to_string(),
            })
        }
    }

    pub async fn logout_all(&self, user_id: DbId) -> Result<u64, CoreError> {
        self.sessions.revoke_all(user_id).await
    }
}
