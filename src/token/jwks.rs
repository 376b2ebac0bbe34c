//! JSON Web Key Set types for the public half of the signing keys.

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Published key set. Order is stable: the current signing key first,
/// then retired keys in rotation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Serialize this JWKS to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    /// Build a JWK from an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be converted to a JWK.
    pub fn from_rsa_public_key(
        public_key: &RsaPublicKey,
        kid: impl Into<String>,
    ) -> Result<Self, super::jwt::Error> {
        let n = Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be());
        let e = Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be());
        Ok(Self {
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n,
            e,
        })
    }

    /// Convert this JWK to an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base64url values cannot be decoded or the RSA
    /// key is invalid.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, super::jwt::Error> {
        let n_bytes =
            Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| super::jwt::Error::Base64)?;
        let e_bytes =
            Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| super::jwt::Error::Base64)?;
        let n = BigUint::from_bytes_be(&n_bytes);
        let e = BigUint::from_bytes_be(&e_bytes);
        RsaPublicKey::new(n, e).map_err(super::jwt::Error::Rsa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::keys::{parse_private_key_pem, TEST_PRIVATE_KEY_PEM};

    #[test]
    fn jwk_round_trips_public_key() -> anyhow::Result<()> {
        let private = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let public = RsaPublicKey::from(&private);
        let jwk = Jwk::from_rsa_public_key(&public, "k1")?;

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));

        let recovered = jwk.to_rsa_public_key()?;
        assert_eq!(recovered, public);
        Ok(())
    }

    #[test]
    fn find_by_kid_matches_exactly() -> anyhow::Result<()> {
        let private = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let public = RsaPublicKey::from(&private);
        let jwks = Jwks {
            keys: vec![
                Jwk::from_rsa_public_key(&public, "k1")?,
                Jwk::from_rsa_public_key(&public, "k2")?,
            ],
        };
        assert_eq!(jwks.find_by_kid("k2").map(|k| k.kid.as_str()), Some("k2"));
        assert!(jwks.find_by_kid("k3").is_none());
        Ok(())
    }

    #[test]
    fn jwks_json_never_contains_private_fields() -> anyhow::Result<()> {
        let private = parse_private_key_pem(TEST_PRIVATE_KEY_PEM)?;
        let public = RsaPublicKey::from(&private);
        let jwks = Jwks {
            keys: vec![Jwk::from_rsa_public_key(&public, "k1")?],
        };
        let json = jwks.to_json_pretty()?;
        // RSA private components must never be published.
        for private_field in ["\"d\"", "\"p\"", "\"q\"", "\"dp\"", "\"dq\"", "\"qi\""] {
            assert!(!json.contains(private_field), "found {private_field}");
        }
        Ok(())
    }
}
