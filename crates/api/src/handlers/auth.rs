//! Handlers for the `/auth` resource (register, login, refresh, logout,
//! roles, profile).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::service::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, RegisterResponse,
    TokenRefreshResponse, UserProfile,
};
use crate::error::{AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let response = state.auth.register(&input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    AppJson(input): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.auth.login(&input, client).await?))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new access token. The refresh token is
/// returned unchanged.
pub async fn refresh(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    AppJson(input): AppJson<RefreshTokenRequest>,
) -> AppResult<Json<TokenRefreshResponse>> {
    Ok(Json(state.auth.refresh(&input.refresh_token, &client).await?))
}

/// POST /api/v1/auth/logout
///
/// Revoke the session behind the given refresh token. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    AppJson(input): AppJson<RefreshTokenRequest>,
) -> AppResult<StatusCode> {
    state.auth.logout(&input.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/roles
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let data = state.auth.list_roles().await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let data = state.auth.profile(user.user_id).await?;
    Ok(Json(DataResponse { data }))
}
