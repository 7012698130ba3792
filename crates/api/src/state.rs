use std::sync::Arc;

use warden_core::session::SessionStore;
use warden_core::types::{system_clock, Clock};
use warden_core::user::{RoleStore, UserDirectory};
use warden_db::memory::{MemoryRoleStore, MemorySessionStore, MemoryUserDirectory};
use warden_db::{DbPool, PgRoleStore, PgSessionStore, PgUserDirectory};

use crate::auth::jwt::AccessTokenIssuer;
use crate::auth::service::AuthService;
use crate::auth::session::SessionService;
use crate::config::ServerConfig;

/// Which backend the stores run on. Reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Login, refresh, logout and session management.
    pub auth: Arc<AuthService>,
    pub backend: StoreBackend,
}

/// The three stores the service runs on.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub roles: Arc<dyn RoleStore>,
    pub backend: StoreBackend,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            sessions: Arc::new(MemorySessionStore::new()),
            users: Arc::new(MemoryUserDirectory::new()),
            roles: Arc::new(MemoryRoleStore::new()),
            backend: StoreBackend::Memory,
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self {
            sessions: Arc::new(PgSessionStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            roles: Arc::new(PgRoleStore::new(pool)),
            backend: StoreBackend::Postgres,
        }
    }
}

impl AppState {
    /// Wire the services on top of `stores`.
    pub fn new(config: ServerConfig, stores: Stores) -> Self {
        Self::with_clock(config, stores, system_clock())
    }

    /// Like [`new`](Self::new) with an explicit clock for the session lifecycle.
    pub fn with_clock(config: ServerConfig, stores: Stores, clock: Clock) -> Self {
        let issuer = Arc::new(AccessTokenIssuer::new(&config.jwt.secret));
        let sessions = SessionService::new(
            stores.sessions,
            Arc::clone(&stores.users),
            Arc::clone(&issuer),
            config.session_config(),
        )
        .with_clock(clock);
        let auth = AuthService::new(stores.users, stores.roles, issuer, sessions);

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            backend: stores.backend,
        }
    }
}
