//! Authenticated principal extraction for bearer-token endpoints.
//!
//! Flow Overview: read the `Authorization: Bearer` header, verify the access
//! token against the published key set, then resolve the subject to a live
//! user row. The row is the authority for role and account state so a
//! deactivated or locked user loses access before their token expires.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::lockout::LockoutStatus;
use super::state::AuthState;
use super::storage::find_user_by_id;
use crate::token::Role;

/// Authenticated user context derived from a bearer access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub email: String,
}

/// Resolve a bearer access token into a principal.
///
/// Returns 401 for missing, malformed, expired, or badly signed tokens and
/// for deactivated accounts, 423 while the account is locked out.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Principal, StatusCode> {
    let token = bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state.issuer().verify_access(token).map_err(|err| {
        debug!("Rejected access token: {err}");
        StatusCode::UNAUTHORIZED
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = find_user_by_id(pool, user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !user.is_active {
        return Err(StatusCode::UNAUTHORIZED);
    }

    if let LockoutStatus::Locked { .. } =
        LockoutStatus::from_row(user.locked, user.lock_remaining_seconds)
    {
        return Err(StatusCode::LOCKED);
    }

    Ok(Principal {
        user_id: user.id,
        role: user.role,
        email: user.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extracts_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.remove(AUTHORIZATION);
        assert_eq!(bearer_token(&headers), None);
    }
}
