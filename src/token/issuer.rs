//! Token issuer: mints access/refresh pairs and verifies presented tokens.

use crate::token::jwks::Jwks;
use crate::token::jwt::{self, Claims, Role, TokenKind};
use crate::token::keys::KeyManager;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A freshly minted refresh token together with the registry identity the
/// caller must persist.
pub struct RefreshGrant {
    pub token: String,
    pub jti: Uuid,
    pub expires_in: i64,
}

pub struct TokenIssuer {
    keys: Arc<KeyManager>,
    issuer: String,
    audience: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        keys: Arc<KeyManager>,
        issuer: String,
        audience: String,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            keys,
            issuer,
            audience,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    /// Public keys for `/.well-known/jwks.json`.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        self.keys.jwks()
    }

    /// Mint a short-lived access token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn mint_access_token(
        &self,
        user_id: Uuid,
        role: Role,
        email: &str,
    ) -> Result<String, jwt::Error> {
        let now = now_unix_seconds();
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: user_id.to_string(),
            role,
            email: Some(email.to_string()),
            iat: now,
            exp: now + self.access_ttl_seconds,
            kind: TokenKind::Access,
            jti: None,
        };
        let (kid, key) = self.keys.signing_key();
        jwt::sign_rs256(&key, kid, &claims)
    }

    /// Mint a long-lived refresh token. The returned `jti` must be recorded
    /// in the refresh-token registry before the token is handed out.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn mint_refresh_token(&self, user_id: Uuid, role: Role) -> Result<RefreshGrant, jwt::Error> {
        let now = now_unix_seconds();
        let jti = Uuid::new_v4();
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: user_id.to_string(),
            role,
            email: None,
            iat: now,
            exp: now + self.refresh_ttl_seconds,
            kind: TokenKind::Refresh,
            jti: Some(jti.to_string()),
        };
        let (kid, key) = self.keys.signing_key();
        let token = jwt::sign_rs256(&key, kid, &claims)?;
        Ok(RefreshGrant {
            token,
            jti,
            expires_in: self.refresh_ttl_seconds,
        })
    }

    /// Verify a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, badly signed, expired, or
    /// not an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, jwt::Error> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            return Err(jwt::Error::WrongTokenType);
        }
        Ok(claims)
    }

    /// Verify a presented refresh token. Signature validity says nothing
    /// about redeemability; the registry decides that.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, badly signed, expired,
    /// not a refresh token, or missing its `jti`.
    pub fn verify_refresh(&self, token: &str) -> Result<(Claims, Uuid), jwt::Error> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(jwt::Error::WrongTokenType);
        }
        let jti = claims
            .jti
            .as_deref()
            .and_then(|jti| Uuid::parse_str(jti).ok())
            .ok_or(jwt::Error::TokenFormat)?;
        Ok((claims, jti))
    }

    fn verify(&self, token: &str) -> Result<Claims, jwt::Error> {
        jwt::verify_rs256(
            token,
            &self.keys.jwks(),
            &self.issuer,
            &self.audience,
            now_unix_seconds(),
        )
    }
}

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::keys::{
        parse_private_key_pem, TEST_PRIVATE_KEY_PEM, TEST_PRIVATE_KEY_PEM_2,
    };
    use anyhow::Result;

    fn issuer() -> Result<TokenIssuer> {
        let keys = Arc::new(KeyManager::from_pems(TEST_PRIVATE_KEY_PEM, &[], 0)?);
        Ok(TokenIssuer::new(
            keys,
            "pgwallah-auth".to_string(),
            "pgwallah".to_string(),
            3600,
            60 * 60 * 24 * 30,
        ))
    }

    #[test]
    fn access_token_round_trip() -> Result<()> {
        let issuer = issuer()?;
        let user_id = Uuid::new_v4();
        let token = issuer.mint_access_token(user_id, Role::Admin, "admin@example.com")?;

        let claims = issuer.verify_access(&token)?;
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert_eq!(claims.exp - claims.iat, 3600);
        Ok(())
    }

    #[test]
    fn refresh_token_round_trip_with_jti() -> Result<()> {
        let issuer = issuer()?;
        let user_id = Uuid::new_v4();
        let grant = issuer.mint_refresh_token(user_id, Role::Tenant)?;

        let (claims, jti) = issuer.verify_refresh(&grant.token)?;
        assert_eq!(jti, grant.jti);
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, None);
        Ok(())
    }

    #[test]
    fn token_kinds_are_not_interchangeable() -> Result<()> {
        let issuer = issuer()?;
        let user_id = Uuid::new_v4();
        let access = issuer.mint_access_token(user_id, Role::Tenant, "a@example.com")?;
        let refresh = issuer.mint_refresh_token(user_id, Role::Tenant)?;

        assert!(matches!(
            issuer.verify_refresh(&access),
            Err(jwt::Error::WrongTokenType)
        ));
        assert!(matches!(
            issuer.verify_access(&refresh.token),
            Err(jwt::Error::WrongTokenType)
        ));
        Ok(())
    }

    #[test]
    fn tokens_signed_before_rotation_still_verify() -> Result<()> {
        let keys = Arc::new(KeyManager::from_pems(TEST_PRIVATE_KEY_PEM, &[], 0)?);
        let issuer = TokenIssuer::new(
            Arc::clone(&keys),
            "pgwallah-auth".to_string(),
            "pgwallah".to_string(),
            3600,
            60 * 60 * 24 * 30,
        );
        let token = issuer.mint_access_token(Uuid::new_v4(), Role::Staff, "s@example.com")?;

        let retire_at = now_unix_seconds() + 3600;
        keys.rotate(parse_private_key_pem(TEST_PRIVATE_KEY_PEM_2)?, retire_at)?;
        assert!(issuer.verify_access(&token).is_ok());

        // Once the old key is pruned the old token fails with UnknownKid.
        keys.prune_expired(retire_at);
        assert!(matches!(
            issuer.verify_access(&token),
            Err(jwt::Error::UnknownKid(_))
        ));
        Ok(())
    }
}
