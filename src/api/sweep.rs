//! Background expiry sweep.
//!
//! Expired refresh rows and retired signing keys are already unusable the
//! moment they expire; the sweep only reclaims storage and trims the JWKS.
//! Correctness never depends on it running.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::api::handlers::auth::storage::purge_expired_refresh_tokens;
use crate::token::issuer::now_unix_seconds;
use crate::token::KeyManager;

/// Expired rows stay purgeable-but-present for this long, which keeps very
/// recent expiries visible to replay classification.
const PURGE_GRACE_SECONDS: i64 = 60 * 60;

/// Spawn the periodic sweep. Runs until the process exits.
pub(crate) fn spawn_expiry_sweep(pool: PgPool, keys: Arc<KeyManager>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        // First tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;

        info!(interval_seconds, "Expiry sweep started");

        loop {
            ticker.tick().await;

            match purge_expired_refresh_tokens(&pool, PURGE_GRACE_SECONDS).await {
                Ok(0) => debug!("Expiry sweep: no refresh tokens to purge"),
                Ok(purged) => info!(purged, "Expiry sweep purged refresh tokens"),
                Err(err) => error!("Expiry sweep failed to purge refresh tokens: {err}"),
            }

            let pruned = keys.prune_expired(now_unix_seconds());
            if pruned > 0 {
                info!(pruned, "Expiry sweep dropped retired signing keys");
            }
        }
    });
}
