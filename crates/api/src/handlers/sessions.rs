//! Handlers for the caller's own sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use warden_core::types::SessionId;

use crate::auth::service::SessionInfo;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RevokedCount {
    pub revoked: u64,
}

/// GET /api/v1/auth/sessions
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionInfo>>>> {
    let data = state.auth.list_sessions(user.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/auth/sessions/{id}
///
/// 404 when the session does not exist or belongs to someone else.
pub async fn revoke(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<SessionId>,
) -> AppResult<StatusCode> {
    state.auth.revoke_session(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
pub async fn revoke_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<RevokedCount>>> {
    let revoked = state.auth.logout_all(user.user_id).await?;
    Ok(Json(DataResponse {
        data: RevokedCount { revoked },
    }))
}
