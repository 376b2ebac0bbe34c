//! # PGwallah Auth (Authentication Authority)
//!
//! `pgwallah-auth` is the authentication service for the PGwallah platform.
//! It owns user credentials, issues RS256-signed access/refresh token pairs,
//! and publishes the verification keys as a JWKS for the other services.
//!
//! ## Credentials
//!
//! Passwords are stored as Argon2id hashes. Login failures feed a per-user
//! counter; reaching the configured threshold locks the account for a fixed
//! window. Unknown emails pay for a dummy hash verification so response
//! timing does not reveal which addresses exist.
//!
//! ## Tokens
//!
//! - **Access tokens** are short-lived bearer JWTs carrying `sub`, `role`,
//!   and `email`. They are verified statelessly against the JWKS.
//! - **Refresh tokens** are long-lived and single-use. Each carries a `jti`
//!   registered in the database; redemption revokes it and registers a
//!   successor in one transaction, so replays are rejected even under
//!   concurrent presentation.
//!
//! ## Key rotation
//!
//! The signing key can be rotated without downtime. Retired keys stay in the
//! JWKS, verify-only, until every token they signed has expired.

pub mod api;
pub mod cli;
pub mod token;

pub use api::{built_info, APP_USER_AGENT, GIT_COMMIT_HASH};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
