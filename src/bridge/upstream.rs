//! Outbound calls to the upstream authentication API.

use anyhow::{Context, Result};
use reqwest::{header::COOKIE, Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{fmt::Display, future::Future, time::Duration};
use tracing::{debug, warn};
use url::Url;

use super::cookies::UPSTREAM_COOKIE_NAME;
use crate::APP_USER_AGENT;

pub const SIGN_IN_PATH: &str = "auth/sign-in";
pub const LOGOUT_PATH: &str = "auth/logout";
pub const SIGN_UP_START_PATH: &str = "sign-up/start";
pub const SIGN_UP_VERIFY_OTP_PATH: &str = "sign-up/verify-otp";
pub const SIGN_UP_RESEND_OTP_PATH: &str = "sign-up/resend-otp";
pub const SIGN_UP_COMPLETE_PATH: &str = "sign-up/complete";

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    api_base: Url,
}

impl UpstreamClient {
    /// Build a client with an explicit per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the `reqwest` client cannot be built.
    pub fn new(api_base: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Error creating reqwest client")?;
        Ok(Self { client, api_base })
    }

    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Join `path` onto the base URL without dropping any base path segment.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.api_base.as_str().trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    /// POST `body` as JSON to `path`.
    ///
    /// # Errors
    /// Returns the transport error; non-success statuses are left to the caller.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        let url = self.endpoint(path);
        debug!("Calling upstream: {url}");
        self.client.post(url).json(body).send().await
    }

    /// Ask upstream to invalidate the session behind `token`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status.
    pub async fn logout(&self, token: &SecretString) -> Result<(), reqwest::Error> {
        self.client
            .post(self.endpoint(LOGOUT_PATH))
            .header(
                COOKIE,
                format!("{UPSTREAM_COOKIE_NAME}={}", token.expose_secret()),
            )
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Run a side operation whose failure must never change the caller's outcome.
///
/// Errors are logged and turned into `None`.
pub async fn best_effort<T, E, F>(operation: &str, future: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match future.await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Best-effort {operation} failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> Result<UpstreamClient> {
        UpstreamClient::new(Url::parse(base)?, Duration::from_secs(5))
    }

    #[test]
    fn endpoint_keeps_base_path() -> Result<()> {
        let upstream = client("https://api.example.com/api/v1/")?;
        assert_eq!(
            upstream.endpoint(SIGN_IN_PATH),
            "https://api.example.com/api/v1/auth/sign-in"
        );

        let upstream = client("https://api.example.com/api/v1")?;
        assert_eq!(
            upstream.endpoint("/sign-up/start"),
            "https://api.example.com/api/v1/sign-up/start"
        );
        Ok(())
    }

    #[tokio::test]
    async fn logout_forwards_session_cookie() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("cookie", "x-authenticated=tok"))
            .and(header("user-agent", APP_USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = client(&server.uri())?;
        upstream
            .logout(&SecretString::from("tok".to_string()))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn logout_reports_non_success_status() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let upstream = client(&server.uri())?;
        let result = upstream
            .logout(&SecretString::from("tok".to_string()))
            .await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn timeout_is_reported_as_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign-up/start"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let upstream = UpstreamClient::new(Url::parse(&server.uri())?, Duration::from_millis(100))?;
        let result = upstream
            .post_json(SIGN_UP_START_PATH, &serde_json::json!({"email": "a@b.co"}))
            .await;
        assert!(result.is_err_and(|err| err.is_timeout()));
        Ok(())
    }

    #[tokio::test]
    async fn best_effort_swallows_errors() {
        let ok = best_effort("noop", async { Ok::<_, String>(7) }).await;
        assert_eq!(ok, Some(7));

        let failed = best_effort("noop", async { Err::<u8, _>("boom".to_string()) }).await;
        assert_eq!(failed, None);
    }
}
