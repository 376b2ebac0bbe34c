//! Authenticated password change.
//!
//! A successful change revokes every outstanding refresh token in the same
//! transaction that stores the new hash, so stolen refresh tokens die with
//! the old password.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::credentials::{hash_password, password_policy_violations, verify_password};
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{find_user_by_id, set_password_and_revoke_sessions};
use super::types::{
    ChangePasswordRequest, ErrorResponse, FieldError, MessageResponse, ValidationErrorResponse,
};

#[utoipa::path(
    post,
    path = "/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed; all refresh tokens revoked.", body = MessageResponse),
        (status = 401, description = "Missing bearer token or wrong current password.", body = ErrorResponse),
        (status = 422, description = "New password violates the policy.", body = ValidationErrorResponse),
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let violations = password_policy_violations(&payload.new_password);
    if !violations.is_empty() {
        let fields = violations
            .into_iter()
            .map(|message| FieldError {
                field: "new_password".to_string(),
                message: message.to_string(),
            })
            .collect();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorResponse::new(fields)),
        )
            .into_response();
    }

    let user = match find_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to lookup user for password change: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !verify_password(&user.password_hash, &payload.current_password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Current password is incorrect")),
        )
            .into_response();
    }

    let new_hash = match hash_password(&payload.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash new password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = set_password_and_revoke_sessions(&pool, user.id, &new_hash).await {
        error!("Failed to change password: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    info!(user_id = %user.id, email = %principal.email, "Password changed; all sessions revoked");
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password changed; all sessions have been revoked".to_string(),
        }),
    )
        .into_response()
}
