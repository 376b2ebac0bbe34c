//! Signed-token machinery: RS256 JWT encode/verify, the published JWKS, and
//! the key manager that owns private material.

pub mod issuer;
pub mod jwks;
pub mod jwt;
pub mod keys;

pub use issuer::{RefreshGrant, TokenIssuer};
pub use jwt::{Claims, Role, TokenKind};
pub use keys::KeyManager;
