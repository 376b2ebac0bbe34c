//! Password login.
//!
//! Flow Overview:
//! 1) Look up the user; unknown emails still pay for one hash verification so
//!    timing does not reveal which addresses exist.
//! 2) Reject locked accounts before touching the password, correct or not.
//! 3) On a wrong password, record the failure atomically; the attempt that
//!    reaches the threshold trips the lock.
//! 4) On success, reset the counter and mint an access/refresh pair.

use axum::{
    extract::Extension,
    http::{header::RETRY_AFTER, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::credentials::{verify_dummy_password, verify_password};
use super::lockout::LockoutStatus;
use super::state::AuthState;
use super::storage::{clear_login_failures, find_user_by_email, record_login_failure, UserRow};
use super::types::{ErrorResponse, LoginRequest, TokenPairResponse};
use super::utils::normalize_email;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; returns an access/refresh token pair.", body = TokenPairResponse),
        (status = 401, description = "Unknown email or wrong password.", body = ErrorResponse),
        (status = 403, description = "Account is deactivated.", body = ErrorResponse),
        (status = 423, description = "Account is locked out; Retry-After gives the remaining seconds.", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&payload.email);

    let user = match find_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Same work as a real verification, same uniform answer.
            verify_dummy_password(&payload.password);
            return invalid_credentials();
        }
        Err(err) => {
            error!("Failed to lookup user for login: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let LockoutStatus::Locked {
        retry_after_seconds,
    } = LockoutStatus::from_row(user.locked, user.lock_remaining_seconds)
    {
        return locked_response(retry_after_seconds);
    }

    if !verify_password(&user.password_hash, &payload.password) {
        let policy = state.lockout_policy();
        match record_login_failure(&pool, user.id, policy.threshold, policy.duration_seconds).await
        {
            Ok(outcome) if outcome.locked => {
                warn!(
                    user_id = %user.id,
                    failed_logins = outcome.failed_logins,
                    "Account locked after repeated login failures"
                );
                return locked_response(policy.duration_seconds);
            }
            Ok(_) => return invalid_credentials(),
            Err(err) => {
                error!("Failed to record login failure: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    if !user.is_active {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Account is deactivated")),
        )
            .into_response();
    }

    if let Err(err) = clear_login_failures(&pool, user.id).await {
        error!("Failed to clear login failures: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match issue_token_pair(&pool, &state, &user).await {
        Ok(pair) => {
            info!(user_id = %user.id, "Login succeeded");
            (StatusCode::OK, Json(pair)).into_response()
        }
        Err(err) => {
            error!("Failed to issue token pair: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Mint an access/refresh pair and register the refresh `jti` before either
/// token leaves the process.
pub(super) async fn issue_token_pair(
    pool: &PgPool,
    state: &AuthState,
    user: &UserRow,
) -> anyhow::Result<TokenPairResponse> {
    let issuer = state.issuer();
    let access_token = issuer.mint_access_token(user.id, user.role, &user.email)?;
    let grant = issuer.mint_refresh_token(user.id, user.role)?;

    super::storage::insert_refresh_token(pool, grant.jti, user.id, grant.expires_in).await?;

    Ok(TokenPairResponse {
        access_token,
        refresh_token: grant.token,
        token_type: "bearer".to_string(),
        expires_in: issuer.access_ttl_seconds(),
        user: user.summary(),
    })
}

fn invalid_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(INVALID_CREDENTIALS)),
    )
        .into_response()
}

fn locked_response(retry_after_seconds: i64) -> axum::response::Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = retry_after_seconds.to_string().parse() {
        headers.insert(RETRY_AFTER, value);
    }
    (
        StatusCode::LOCKED,
        headers,
        Json(ErrorResponse::new(
            "Account temporarily locked; try again later",
        )),
    )
        .into_response()
}
