//! Bridge configuration and shared handler state.

use anyhow::Result;
use std::{sync::Arc, time::Duration};
use url::Url;

use super::{
    cookies::CookiePolicy,
    session::{MemorySessionStore, SessionStore},
    upstream::UpstreamClient,
};

const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    api_base: Url,
    environment: Environment,
    upstream_timeout_seconds: u64,
    session_ttl_seconds: u64,
}

impl BridgeConfig {
    #[must_use]
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base,
            environment: Environment::Development,
            upstream_timeout_seconds: DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_upstream_timeout_seconds(mut self, seconds: u64) -> Self {
        self.upstream_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    /// Cookies are only marked `Secure` in production.
    #[must_use]
    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy::new(self.environment.is_production())
    }
}

pub struct BridgeState {
    config: BridgeConfig,
    upstream: UpstreamClient,
    sessions: Arc<dyn SessionStore>,
}

impl BridgeState {
    /// Build state backed by an in-memory session store.
    ///
    /// # Errors
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(
            config.session_ttl_seconds(),
        )));
        Self::with_session_store(config, sessions)
    }

    /// # Errors
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn with_session_store(
        config: BridgeConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let upstream = UpstreamClient::new(config.api_base().clone(), config.upstream_timeout())?;
        Ok(Self {
            config,
            upstream,
            sessions,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("config", &self.config)
            .field("upstream", &self.upstream)
            .field("sessions", &"dyn SessionStore")
            .finish()
    }
}
