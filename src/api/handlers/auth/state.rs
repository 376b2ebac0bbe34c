//! Auth configuration and shared state.

use crate::api::handlers::auth::lockout::LockoutPolicy;
use crate::token::{KeyManager, TokenIssuer};
use std::sync::Arc;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;
const DEFAULT_ISSUER: &str = "pgwallah-auth";
const DEFAULT_AUDIENCE: &str = "pgwallah";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    lockout: LockoutPolicy,
    issuer: String,
    audience: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            lockout: LockoutPolicy::default(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_seconds(mut self, seconds: i64) -> Self {
        self.lockout.duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn lockout(&self) -> LockoutPolicy {
        self.lockout
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Injected into handlers via an axum `Extension`. Holds the token issuer
/// (and through it the key manager) plus the lockout/TTL policy.
pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, keys: Arc<KeyManager>) -> Self {
        let issuer = TokenIssuer::new(
            keys,
            config.issuer.clone(),
            config.audience.clone(),
            config.access_ttl_seconds,
            config.refresh_ttl_seconds,
        );
        Self { config, issuer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub(crate) fn lockout_policy(&self) -> LockoutPolicy {
        self.config.lockout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::keys::TEST_PRIVATE_KEY_PEM;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new();
        assert_eq!(config.access_ttl_seconds(), 3600);
        assert_eq!(config.refresh_ttl_seconds(), 60 * 60 * 24 * 30);
        assert_eq!(config.lockout().threshold, 5);
        assert_eq!(config.lockout().duration_seconds, 900);

        let config = config
            .with_access_ttl_seconds(120)
            .with_refresh_ttl_seconds(600)
            .with_lockout_threshold(3)
            .with_lockout_duration_seconds(60)
            .with_issuer("issuer".to_string())
            .with_audience("audience".to_string());

        assert_eq!(config.access_ttl_seconds(), 120);
        assert_eq!(config.refresh_ttl_seconds(), 600);
        assert_eq!(config.lockout().threshold, 3);
        assert_eq!(config.lockout().duration_seconds, 60);
        assert_eq!(config.issuer, "issuer");
        assert_eq!(config.audience, "audience");
    }

    #[test]
    fn state_wires_issuer_from_config() -> anyhow::Result<()> {
        let keys = Arc::new(KeyManager::from_pems(TEST_PRIVATE_KEY_PEM, &[], 0)?);
        let state = AuthState::new(AuthConfig::new().with_access_ttl_seconds(120), keys);
        assert_eq!(state.issuer().access_ttl_seconds(), 120);
        assert_eq!(state.lockout_policy().threshold, 5);
        Ok(())
    }
}
