pub mod auth;
pub mod keys;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("pgwallah-auth")
        .about("Authentication service for the PGwallah platform")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8010")
                .env("PGWALLAH_AUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("PGWALLAH_AUTH_DSN")
                .required(true),
        );

    let command = keys::with_args(command);
    let command = auth::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "pgwallah-auth");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Authentication service for the PGwallah platform".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn defaults_match_service_configuration() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "pgwallah-auth",
            "--dsn",
            "postgres://localhost/pgwallah",
            "--signing-key",
            "/tmp/signing.pem",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8010));
        assert_eq!(
            matches.get_one::<i64>("access-ttl-seconds").copied(),
            Some(3600)
        );
        assert_eq!(
            matches.get_one::<i64>("refresh-ttl-seconds").copied(),
            Some(2_592_000)
        );
        assert_eq!(
            matches.get_one::<i32>("lockout-threshold").copied(),
            Some(5)
        );
        assert_eq!(
            matches.get_one::<i64>("lockout-duration-seconds").copied(),
            Some(900)
        );
        assert_eq!(
            matches.get_one::<String>("token-issuer").cloned(),
            Some("pgwallah-auth".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("token-audience").cloned(),
            Some("pgwallah".to_string())
        );
    }

    #[test]
    fn retired_keys_are_repeatable() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "pgwallah-auth",
            "--dsn",
            "postgres://localhost/pgwallah",
            "--signing-key",
            "/tmp/signing.pem",
            "--retired-key",
            "/tmp/old-1.pem",
            "--retired-key",
            "/tmp/old-2.pem",
        ]);

        let retired: Vec<String> = matches
            .get_many::<String>("retired-key")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default();
        assert_eq!(retired, vec!["/tmp/old-1.pem", "/tmp/old-2.pem"]);
    }
}
