use anyhow::{Context, Result};
use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("access-ttl-seconds")
                .long("access-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("PGWALLAH_AUTH_ACCESS_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-ttl-seconds")
                .long("refresh-ttl-seconds")
                .help("Refresh token TTL in seconds")
                .env("PGWALLAH_AUTH_REFRESH_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("lockout-threshold")
                .long("lockout-threshold")
                .help("Failed logins before an account is locked")
                .env("PGWALLAH_AUTH_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("lockout-duration-seconds")
                .long("lockout-duration-seconds")
                .help("How long a lockout lasts in seconds")
                .env("PGWALLAH_AUTH_LOCKOUT_DURATION_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("token-issuer")
                .long("token-issuer")
                .help("Issuer (iss) claim for minted tokens")
                .env("PGWALLAH_AUTH_TOKEN_ISSUER")
                .default_value("pgwallah-auth"),
        )
        .arg(
            Arg::new("token-audience")
                .long("token-audience")
                .help("Audience (aud) claim for minted tokens")
                .env("PGWALLAH_AUTH_TOKEN_AUDIENCE")
                .default_value("pgwallah"),
        )
        .arg(
            Arg::new("sweep-interval-seconds")
                .long("sweep-interval-seconds")
                .help("Interval for the expired-token sweep")
                .env("PGWALLAH_AUTH_SWEEP_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_duration_seconds: i64,
    pub token_issuer: String,
    pub token_audience: String,
    pub sweep_interval_seconds: u64,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            access_ttl_seconds: matches
                .get_one::<i64>("access-ttl-seconds")
                .copied()
                .context("missing --access-ttl-seconds")?,
            refresh_ttl_seconds: matches
                .get_one::<i64>("refresh-ttl-seconds")
                .copied()
                .context("missing --refresh-ttl-seconds")?,
            lockout_threshold: matches
                .get_one::<i32>("lockout-threshold")
                .copied()
                .context("missing --lockout-threshold")?,
            lockout_duration_seconds: matches
                .get_one::<i64>("lockout-duration-seconds")
                .copied()
                .context("missing --lockout-duration-seconds")?,
            token_issuer: matches
                .get_one::<String>("token-issuer")
                .cloned()
                .context("missing --token-issuer")?,
            token_audience: matches
                .get_one::<String>("token-audience")
                .cloned()
                .context("missing --token-audience")?,
            sweep_interval_seconds: matches
                .get_one::<u64>("sweep-interval-seconds")
                .copied()
                .context("missing --sweep-interval-seconds")?,
        })
    }
}
