//! Refresh-token redemption and logout.
//!
//! Every refresh token is single-use. Redemption retires the presented `jti`
//! and registers its successor in one transaction, so a replayed token is
//! rejected even when two presentations race.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::AuthState;
use super::storage::{
    find_user_by_id, redeem_refresh_token, revoke_refresh_token, RedeemOutcome,
};
use super::types::{ErrorResponse, LogoutRequest, RefreshRequest, TokenPairResponse};
use crate::token::jwt;

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated; returns a new access/refresh pair.", body = TokenPairResponse),
        (status = 401, description = "Invalid, expired, or already-used refresh token.", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<RefreshRequest>,
) -> impl IntoResponse {
    let issuer = state.issuer();

    let (claims, jti) = match issuer.verify_refresh(&payload.refresh_token) {
        Ok(verified) => verified,
        // The JWT exp elapses at or before the registry row's expires_at, so
        // expiry is caught here and must keep its distinguishable answer.
        Err(jwt::Error::Expired) => return unauthorized("Refresh token expired"),
        Err(err) => {
            debug!("Rejected refresh token: {err}");
            return unauthorized("Invalid refresh token");
        }
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return unauthorized("Invalid refresh token");
    };

    // Mint the successor before the transaction: its jti must be inserted
    // atomically with the revocation of the presented token.
    let grant = match issuer.mint_refresh_token(user_id, claims.role) {
        Ok(grant) => grant,
        Err(err) => {
            error!("Failed to mint successor refresh token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let outcome = match redeem_refresh_token(&pool, jti, grant.jti, grant.expires_in).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to redeem refresh token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let registry_user_id = match outcome {
        RedeemOutcome::Rotated { user_id } => user_id,
        RedeemOutcome::Replayed => {
            warn!(user_id = %user_id, jti = %jti, "Refresh token replay detected");
            return unauthorized("Refresh token already used");
        }
        RedeemOutcome::Expired => return unauthorized("Refresh token expired"),
        RedeemOutcome::Unknown => return unauthorized("Invalid refresh token"),
    };

    if registry_user_id != user_id {
        error!(jti = %jti, "Refresh token subject does not match registry");
        return unauthorized("Invalid refresh token");
    }

    let user = match find_user_by_id(&pool, user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(Some(_)) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Account is deactivated")),
            )
                .into_response();
        }
        Ok(None) => return unauthorized("Invalid refresh token"),
        Err(err) => {
            error!("Failed to lookup user for refresh: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let access_token = match issuer.mint_access_token(user.id, user.role, &user.email) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to mint access token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!(user_id = %user.id, "Refresh token rotated");
    (
        StatusCode::OK,
        Json(TokenPairResponse {
            access_token,
            refresh_token: grant.token,
            token_type: "bearer".to_string(),
            expires_in: issuer.access_ttl_seconds(),
            user: user.summary(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 204, description = "Refresh token revoked. Idempotent."),
    ),
    tag = "auth"
)]
pub async fn logout(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<LogoutRequest>,
) -> impl IntoResponse {
    // The refresh token itself authenticates the request. Invalid tokens get
    // the same 204 as valid ones so logout leaks nothing.
    if let Ok((claims, jti)) = state.issuer().verify_refresh(&payload.refresh_token) {
        if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
            if let Err(err) = revoke_refresh_token(&pool, jti, user_id).await {
                error!("Failed to revoke refresh token: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            debug!(user_id = %user_id, "Logout revoked refresh token");
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

fn unauthorized(message: &str) -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
}
