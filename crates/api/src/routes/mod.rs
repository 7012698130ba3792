pub mod auth;
pub mod gates;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                    register (public)
/// /auth/login                       login (public)
/// /auth/refresh                     refresh (public)
/// /auth/logout                      logout (refresh token in body)
/// /auth/roles                       list role names (public)
/// /auth/me                          profile (auth required)
/// /auth/sessions                    list own sessions (auth required)
/// /auth/sessions/{id}               revoke own session (auth required)
/// /auth/logout-all                  revoke all own sessions (auth required)
///
/// /gates/admin/ping                 ADMINISTRATOR only
/// /gates/attendant/ping             ATTENDANT only
/// /gates/patient/ping               PATIENT only
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/gates", gates::router())
}
