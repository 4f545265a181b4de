//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action that starts the bridge server.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::upstream;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let upstream_opts = upstream::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        api_base: upstream_opts.api_base,
        environment: upstream_opts.environment,
        upstream_timeout_seconds: upstream_opts.upstream_timeout_seconds,
        session_ttl_seconds: upstream_opts.session_ttl_seconds,
    }))
}
