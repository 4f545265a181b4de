use clap::{Arg, ArgMatches, Command};
use url::Url;

use crate::bridge::Environment;

pub const ARG_API_BASE: &str = "api-base";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_UPSTREAM_TIMEOUT_SECONDS: &str = "upstream-timeout-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

/// Longest accepted local session lifetime (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug)]
pub struct Options {
    pub api_base: Url,
    pub environment: Environment,
    pub upstream_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
}

impl Options {
    /// Parse upstream and session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the API base is missing or not an http(s) URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let api_base = matches
            .get_one::<String>(ARG_API_BASE)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_API_BASE}"))?;
        let api_base = Url::parse(api_base)
            .map_err(|err| anyhow::anyhow!("invalid --{ARG_API_BASE} {api_base}: {err}"))?;
        if !matches!(api_base.scheme(), "http" | "https") {
            anyhow::bail!("--{ARG_API_BASE} must be an http(s) URL");
        }

        Ok(Self {
            api_base,
            environment: matches
                .get_one::<Environment>(ARG_ENVIRONMENT)
                .copied()
                .unwrap_or(Environment::Development),
            upstream_timeout_seconds: matches
                .get_one::<u64>(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(604_800),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_BASE)
                .long(ARG_API_BASE)
                .help("Upstream authentication API base URL, example: https://api.tld/api/v1")
                .env("AUTHBRIDGE_API_BASE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production marks cookies Secure")
                .env("AUTHBRIDGE_ENV")
                .default_value("development")
                .value_parser(|value: &str| {
                    Environment::parse(value)
                        .ok_or_else(|| "expected development or production".to_string())
                }),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .help("Timeout for each upstream request in seconds")
                .env("AUTHBRIDGE_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Local session cookie TTL in seconds, at most one year")
                .env("AUTHBRIDGE_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
}
