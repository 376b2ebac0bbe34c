//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via the bearer access token.
//! 2) Resolve the current user from the database.
//! 3) Apply allow-listed profile updates.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::auth::principal::require_auth;
use super::auth::types::{FieldError, UpdateProfileRequest, UserSummary, ValidationErrorResponse};
use super::auth::AuthState;

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated user profile.", body = UserSummary),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 423, description = "Account is locked out."),
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match crate::api::handlers::auth::storage::find_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user.summary())).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch /me profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated.", body = UserSummary),
        (status = 400, description = "No updates provided."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 422, description = "Invalid update payload.", body = ValidationErrorResponse),
    ),
    tag = "me"
)]
pub async fn put_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    debug!(user_id = %principal.user_id, role = %principal.role, "Profile update requested");

    let full_name = normalize_optional(payload.full_name);
    let phone = normalize_optional(payload.phone);

    if full_name.is_none() && phone.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    if let Some(phone) = phone.as_deref() {
        if !super::auth::utils::valid_phone(phone) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse::new(vec![FieldError {
                    field: "phone".to_string(),
                    message: "must be 7-15 digits with an optional leading +".to_string(),
                }])),
            )
                .into_response();
        }
    }

    match crate::api::handlers::auth::storage::update_profile(
        &pool,
        principal.user_id,
        full_name.as_deref(),
        phone.as_deref(),
    )
    .await
    {
        Ok(Some(user)) => (StatusCode::OK, Json(user.summary())).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update /me profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
