//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use warden_api::error::AppError;
use warden_core::error::{CoreError, StoreError};

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn credential_and_token_errors_are_401() {
    let (status, json) = error_to_response(CoreError::InvalidCredentials.into()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");
    assert_eq!(json["error"], "Invalid email or password");

    let (status, json) = error_to_response(CoreError::InvalidOrExpiredToken.into()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_OR_EXPIRED_TOKEN");
}

#[tokio::test]
async fn disabled_and_forbidden_are_403() {
    let (status, json) = error_to_response(CoreError::AccountDisabled.into()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "ACCOUNT_DISABLED");

    let (status, json) =
        error_to_response(CoreError::Forbidden("PATIENT role required".into()).into()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "PATIENT role required");
}

#[tokio::test]
async fn not_found_is_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "session",
        id: "abc".into(),
    });
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session with id abc not found");
}

#[tokio::test]
async fn registration_errors() {
    let (status, _) = error_to_response(CoreError::RoleNotFound("X".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) =
        error_to_response(CoreError::DuplicateUser("a@b.c".into()).into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_USER");
}

#[tokio::test]
async fn storage_failure_is_503_and_not_leaked() {
    let err: CoreError = StoreError::Unavailable("connection refused to 10.1.2.3".into()).into();
    let (status, json) = error_to_response(err.into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!json["error"].as_str().unwrap().contains("10.1.2.3"));
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let err: CoreError = StoreError::HashCollision.into();
    let (status, json) = error_to_response(err.into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");

    let (status, json) = error_to_response(AppError::BadRequest("bad".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}
