use crate::bridge::{self, BridgeConfig, BridgeState, Environment};
use crate::cli::telemetry;
use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_base: Url,
    pub environment: Environment,
    pub upstream_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::new(self.api_base.clone())
            .with_environment(self.environment)
            .with_upstream_timeout_seconds(self.upstream_timeout_seconds)
            .with_session_ttl_seconds(self.session_ttl_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the upstream client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let state = BridgeState::new(args.bridge_config()).context("Failed to build bridge state")?;

    let result = bridge::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}
