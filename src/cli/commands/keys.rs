use anyhow::{Context, Result};
use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("signing-key")
                .long("signing-key")
                .help("Path to the PEM-encoded RSA private key used for signing")
                .env("PGWALLAH_AUTH_SIGNING_KEY")
                .required(true),
        )
        .arg(
            Arg::new("retired-key")
                .long("retired-key")
                .help("Path to a retired RSA private key kept for verification only (repeatable)")
                .env("PGWALLAH_AUTH_RETIRED_KEY")
                .action(clap::ArgAction::Append),
        )
}

#[derive(Debug)]
pub struct Options {
    pub signing_key_path: String,
    pub retired_key_paths: Vec<String>,
}

impl Options {
    /// Extract key options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if the required signing key argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            signing_key_path: matches
                .get_one::<String>("signing-key")
                .cloned()
                .context("missing required argument: --signing-key")?,
            retired_key_paths: matches
                .get_many::<String>("retired-key")
                .map(|paths| paths.cloned().collect())
                .unwrap_or_default(),
        })
    }
}
