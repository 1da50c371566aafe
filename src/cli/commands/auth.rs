use crate::auth::token::MIN_SECRET_BYTES;
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";

pub struct Options {
    pub jwt_secret: SecretString,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or too short, or if the
    /// refresh TTL is shorter than the access TTL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = match matches.get_one::<String>(ARG_JWT_SECRET) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_JWT_SECRET}"),
        };
        if jwt_secret.expose_secret().len() < MIN_SECRET_BYTES {
            anyhow::bail!("--{ARG_JWT_SECRET} must be at least {MIN_SECRET_BYTES} bytes");
        }

        let access = matches
            .get_one::<u64>(ARG_ACCESS_TOKEN_TTL)
            .copied()
            .unwrap_or(900);
        let refresh = matches
            .get_one::<u64>(ARG_REFRESH_TOKEN_TTL)
            .copied()
            .unwrap_or(604_800);
        if refresh < access {
            anyhow::bail!("--{ARG_REFRESH_TOKEN_TTL} must not be shorter than --{ARG_ACCESS_TOKEN_TTL}");
        }

        Ok(Self {
            jwt_secret,
            access_ttl: Duration::from_secs(access),
            refresh_ttl: Duration::from_secs(refresh),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HMAC secret used to sign access and refresh tokens")
                .long_help(format!(
                    "HMAC-SHA256 secret used to sign access and refresh tokens. Must be at least {MIN_SECRET_BYTES} bytes. Rotating it invalidates every issued token."
                ))
                .env("NOTEKEEPER_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime in seconds")
                .env("NOTEKEEPER_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token lifetime in seconds")
                .env("NOTEKEEPER_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
