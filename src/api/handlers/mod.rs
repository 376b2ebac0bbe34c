//! HTTP handlers.

pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod jwks;
pub(crate) mod me;

pub use auth::{AuthConfig, AuthState};
