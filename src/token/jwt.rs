//! RS256 JWT encoding and verification.
//!
//! Tokens are treated as opaque strings everywhere else in the crate; this
//! module is the only place that encodes or decodes them. Verification goes
//! through the published JWKS so downstream services share the exact same
//! code path.

use crate::token::jwks::Jwks;
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{errors::Error as RsaError, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Closed set of user roles carried in the `role` claim.
///
/// Kept as an enum (not a free string) so downstream authorization matches
/// are exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tenant,
    Admin,
    Staff,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tenant" => Ok(Self::Tenant),
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}

/// Whether a token grants resource access or only a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub alg: String,
    pub typ: String,
    pub kid: String,
}

impl Header {
    fn rs256(kid: impl Into<String>) -> Self {
        Self {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
            kid: kid.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    /// User id.
    pub sub: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Refresh-token identifier matching the registry row. Absent on access
    /// tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("failed to parse RSA key")]
    KeyParse,
    #[error("rsa error")]
    Rsa(#[from] RsaError),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("wrong token type")]
    WrongTokenType,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an RS256 signed JWT.
///
/// # Errors
///
/// Returns an error if claims/header JSON cannot be encoded or signing fails.
pub fn sign_rs256(
    private_key: &RsaPrivateKey,
    kid: impl Into<String>,
    claims: &Claims,
) -> Result<String, Error> {
    let header = Header::rs256(kid);
    let header_b64 = b64e_json(&header)?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature: Signature = signing_key.sign(signing_input.as_bytes());
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify an RS256 JWT against a JWKS and return its decoded claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the `kid` is unknown for the provided JWKS,
/// - the signature is invalid,
/// - the claims fail validation (`iss`, `aud`, `exp`).
pub fn verify_rs256(
    token: &str,
    jwks: &Jwks,
    expected_issuer: &str,
    expected_audience: &str,
    now_unix_seconds: i64,
) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    let header: Header = b64d_json(header_b64)?;
    if header.alg != "RS256" {
        return Err(Error::UnsupportedAlg(header.alg));
    }

    let jwk = jwks
        .find_by_kid(&header.kid)
        .ok_or_else(|| Error::UnknownKid(header.kid.clone()))?;

    let public_key = jwk.to_rsa_public_key()?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature_bytes = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| Error::InvalidSignature)?;
    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| Error::InvalidSignature)?;

    let claims: Claims = b64d_json(claims_b64)?;
    if claims.iss != expected_issuer {
        return Err(Error::InvalidIssuer);
    }
    if claims.aud != expected_audience {
        return Err(Error::InvalidAudience);
    }
    if claims.exp <= now_unix_seconds {
        return Err(Error::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::keys::{parse_private_key_pem, TEST_PRIVATE_KEY_PEM};

    const NOW: i64 = 1_700_000_000;

    fn test_claims(kind: TokenKind, jti: Option<&str>) -> Claims {
        Claims {
            iss: "pgwallah-auth".to_string(),
            aud: "pgwallah".to_string(),
            sub: "user-123".to_string(),
            role: Role::Tenant,
            email: Some("alice@example.com".to_string()),
            iat: NOW,
            exp: NOW + 3600,
            kind,
            jti: jti.map(str::to_string),
        }
    }

    fn test_jwks(kid: &str) -> Result<Jwks, Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let public = rsa::RsaPublicKey::from(&key);
        let jwk = crate::token::jwks::Jwk::from_rsa_public_key(&public, kid)?;
        Ok(Jwks { keys: vec![jwk] })
    }

    #[test]
    fn sign_and_verify_round_trip() -> Result<(), Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let token = sign_rs256(&key, "k1", &test_claims(TokenKind::Access, None))?;

        let verified = verify_rs256(&token, &test_jwks("k1")?, "pgwallah-auth", "pgwallah", NOW)?;
        assert_eq!(verified.sub, "user-123");
        assert_eq!(verified.role, Role::Tenant);
        assert_eq!(verified.kind, TokenKind::Access);
        assert_eq!(verified.jti, None);
        Ok(())
    }

    #[test]
    fn refresh_claims_carry_jti() -> Result<(), Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let token = sign_rs256(&key, "k1", &test_claims(TokenKind::Refresh, Some("jti-1")))?;

        let verified = verify_rs256(&token, &test_jwks("k1")?, "pgwallah-auth", "pgwallah", NOW)?;
        assert_eq!(verified.kind, TokenKind::Refresh);
        assert_eq!(verified.jti.as_deref(), Some("jti-1"));
        Ok(())
    }

    #[test]
    fn rejects_expired_or_wrong_claims() -> Result<(), Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let token = sign_rs256(&key, "k1", &test_claims(TokenKind::Access, None))?;
        let jwks = test_jwks("k1")?;

        let result = verify_rs256(&token, &jwks, "pgwallah-auth", "other-aud", NOW);
        assert!(matches!(result, Err(Error::InvalidAudience)));

        let result = verify_rs256(&token, &jwks, "someone-else", "pgwallah", NOW);
        assert!(matches!(result, Err(Error::InvalidIssuer)));

        let result = verify_rs256(&token, &jwks, "pgwallah-auth", "pgwallah", NOW + 7200);
        assert!(matches!(result, Err(Error::Expired)));

        Ok(())
    }

    #[test]
    fn rejects_unknown_kid() -> Result<(), Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let token = sign_rs256(&key, "rotated-out", &test_claims(TokenKind::Access, None))?;

        let result = verify_rs256(&token, &test_jwks("k1")?, "pgwallah-auth", "pgwallah", NOW);
        assert!(matches!(result, Err(Error::UnknownKid(kid)) if kid == "rotated-out"));
        Ok(())
    }

    #[test]
    fn rejects_tampered_payload() -> Result<(), Error> {
        let key = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let token = sign_rs256(&key, "k1", &test_claims(TokenKind::Access, None))?;
        let jwks = test_jwks("k1")?;

        // Swap in claims for a different subject while keeping the signature.
        let mut forged = test_claims(TokenKind::Access, None);
        forged.sub = "user-999".to_string();
        let forged_b64 = b64e_json(&forged)?;
        let mut parts = token.split('.');
        let header = parts.next().ok_or(Error::TokenFormat)?;
        let sig = parts.nth(1).ok_or(Error::TokenFormat)?;
        let tampered = format!("{header}.{forged_b64}.{sig}");

        let result = verify_rs256(&tampered, &jwks, "pgwallah-auth", "pgwallah", NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() -> Result<(), Error> {
        let jwks = test_jwks("k1")?;
        for garbage in ["", "a.b", "a.b.c.d", "not a token at all"] {
            let result = verify_rs256(garbage, &jwks, "pgwallah-auth", "pgwallah", NOW);
            assert!(result.is_err(), "accepted garbage token: {garbage:?}");
        }
        Ok(())
    }

    #[test]
    fn role_parses_and_displays() {
        assert_eq!("tenant".parse::<Role>().ok(), Some(Role::Tenant));
        assert_eq!("admin".parse::<Role>().ok(), Some(Role::Admin));
        assert_eq!("staff".parse::<Role>().ok(), Some(Role::Staff));
        assert!(matches!(
            "owner".parse::<Role>(),
            Err(Error::UnknownRole(role)) if role == "owner"
        ));
        assert_eq!(Role::Staff.to_string(), "staff");
    }

    #[test]
    fn claims_serialize_type_field() -> Result<(), Error> {
        let value = serde_json::to_value(test_claims(TokenKind::Refresh, Some("jti-9")))?;
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("refresh"));
        assert_eq!(value.get("role").and_then(|v| v.as_str()), Some("tenant"));
        assert_eq!(value.get("jti").and_then(|v| v.as_str()), Some("jti-9"));
        Ok(())
    }
}
