//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and passes its roles to
//! [`authorize`], rejecting with 403 Forbidden when the role is missing.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_core::roles::{authorize, ROLE_ADMINISTRATOR, ROLE_ATTENDANT, ROLE_PATIENT};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require(
    role: &str,
    parts: &mut Parts,
    state: &AppState,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    authorize(role, &user.roles)?;
    Ok(user)
}

/// Requires the `ADMINISTRATOR` role.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(ROLE_ADMINISTRATOR, parts, state).await.map(RequireAdmin)
    }
}

/// Requires the `ATTENDANT` role.
pub struct RequireAttendant(pub AuthUser);

impl FromRequestParts<AppState> for RequireAttendant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(ROLE_ATTENDANT, parts, state).await.map(RequireAttendant)
    }
}

/// Requires the `PATIENT` role.
pub struct RequirePatient(pub AuthUser);

impl FromRequestParts<AppState> for RequirePatient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(ROLE_PATIENT, parts, state).await.map(RequirePatient)
    }
}
