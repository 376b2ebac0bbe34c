//! Published JSON Web Key Set.

use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;

use super::auth::AuthState;
use crate::token::jwks::Jwks;

#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    responses(
        (status = 200, description = "Public keys for verifying issued tokens. Includes the active signing key and any retired keys still in their verification window.", body = Jwks),
    ),
    tag = "jwks"
)]
pub async fn jwks(state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Only public material crosses this boundary; the Jwk type has no
    // private fields to leak.
    Json(state.issuer().jwks())
}
