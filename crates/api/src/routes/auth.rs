//! Route definitions for the `/auth` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{auth, sessions};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /register        -> register
/// POST   /login           -> login
/// POST   /refresh         -> refresh
/// POST   /logout          -> logout
/// GET    /roles           -> list_roles
/// GET    /me              -> me (requires auth)
/// GET    /sessions        -> list sessions (requires auth)
/// DELETE /sessions/{id}   -> revoke session (requires auth)
/// POST   /logout-all      -> revoke all sessions (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/roles", get(auth::list_roles))
        .route("/me", get(auth::me))
        .route("/sessions", get(sessions::list))
        .route("/sessions/{id}", delete(sessions::revoke))
        .route("/logout-all", post(sessions::revoke_all))
}
