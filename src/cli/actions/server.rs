use crate::{
    api,
    api::handlers::auth,
    token::{issuer::now_unix_seconds, KeyManager},
};
use anyhow::{Context, Result};
use std::{fs, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_key_path: String,
    pub retired_key_paths: Vec<String>,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_duration_seconds: i64,
    pub token_issuer: String,
    pub token_audience: String,
    pub sweep_interval_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if key material cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    // No signing key, no service. Fail before binding the port.
    let signing_pem = fs::read(&args.signing_key_path)
        .with_context(|| format!("Failed to read signing key: {}", args.signing_key_path))?;

    let mut retired_pems = Vec::with_capacity(args.retired_key_paths.len());
    for path in &args.retired_key_paths {
        let pem = fs::read(path).with_context(|| format!("Failed to read retired key: {path}"))?;
        retired_pems.push(pem);
    }

    // Retired keys verify tokens minted before rotation, so they must stay
    // published for as long as the oldest still-valid refresh token.
    let retire_at = now_unix_seconds() + args.refresh_ttl_seconds;
    let keys = Arc::new(KeyManager::from_pems(&signing_pem, &retired_pems, retire_at)?);
    info!(kids = ?keys.kids(), "Loaded signing keys");

    auth::check_dummy_hash()?;

    let auth_config = auth::AuthConfig::new()
        .with_access_ttl_seconds(args.access_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_ttl_seconds)
        .with_lockout_threshold(args.lockout_threshold)
        .with_lockout_duration_seconds(args.lockout_duration_seconds)
        .with_issuer(args.token_issuer)
        .with_audience(args.token_audience);

    api::new(
        args.port,
        args.dsn,
        auth_config,
        keys,
        args.sweep_interval_seconds,
    )
    .await
}
