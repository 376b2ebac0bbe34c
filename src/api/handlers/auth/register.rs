//! Account registration.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::credentials::hash_password;
use super::login::issue_token_pair;
use super::state::AuthState;
use super::storage::{create_user, CreateUserOutcome};
use super::types::{
    ErrorResponse, FieldError, RegisterRequest, TokenPairResponse, ValidationErrorResponse,
};
use super::utils::{normalize_email, valid_email, valid_phone};
use crate::token::Role;

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; the new user is logged in and gets a token pair.", body = TokenPairResponse),
        (status = 409, description = "Email already registered.", body = ErrorResponse),
        (status = 422, description = "Invalid registration payload.", body = ValidationErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&payload.email);

    let mut fields = Vec::new();
    if !valid_email(&email) {
        fields.push(FieldError {
            field: "email".to_string(),
            message: "must be a valid email address".to_string(),
        });
    }
    if payload.full_name.trim().is_empty() {
        fields.push(FieldError {
            field: "full_name".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if let Some(phone) = payload.phone.as_deref() {
        if !valid_phone(phone) {
            fields.push(FieldError {
                field: "phone".to_string(),
                message: "must be 7-15 digits with an optional leading +".to_string(),
            });
        }
    }
    for violation in super::credentials::password_policy_violations(&payload.password) {
        fields.push(FieldError {
            field: "password".to_string(),
            message: violation.to_string(),
        });
    }
    if !fields.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorResponse::new(fields)),
        )
            .into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let role = payload.role.unwrap_or(Role::Tenant);

    match create_user(
        &pool,
        &email,
        &password_hash,
        payload.full_name.trim(),
        payload.phone.as_deref(),
        role,
    )
    .await
    {
        // Registration logs the new user straight in.
        Ok(CreateUserOutcome::Created(user)) => match issue_token_pair(&pool, &state, &user).await {
            Ok(pair) => {
                info!(user_id = %user.id, "Registered new account");
                (StatusCode::CREATED, Json(pair)).into_response()
            }
            Err(err) => {
                error!("Failed to issue token pair for new account: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(CreateUserOutcome::DuplicateEmail) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Email already registered")),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to create user: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
