use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::SET_COOKIE, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

use super::{json_payload, require_min_chars, SuccessResponse};
use crate::bridge::{
    cookies::{request_cookie, upstream_session_cookies, SESSION_COOKIE_NAME},
    error::BridgeError,
    session::{generate_session_id, SessionData},
    state::BridgeState,
    upstream::SIGN_IN_PATH,
};

const SIGN_IN_FAILED: &str = "Failed to sign in";

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

impl SignInRequest {
    fn validate(&self) -> Result<(), BridgeError> {
        require_min_chars(&self.email, 3, "Email must be at least 3 characters")?;
        require_min_chars(&self.password, 8, "Password must be at least 8 characters")
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = SuccessResponse),
        (status = 400, description = "Invalid credentials payload", body = crate::bridge::error::ErrorBody),
        (status = 401, description = "Rejected by upstream", body = crate::bridge::error::ErrorBody),
        (status = 500, description = "Upstream unreachable", body = crate::bridge::error::ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    headers: HeaderMap,
    state: Extension<Arc<BridgeState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<SuccessResponse>), BridgeError> {
    let request = json_payload(payload)?;
    request.validate()?;

    let response = state
        .upstream()
        .post_json(SIGN_IN_PATH, &request)
        .await
        .map_err(|err| {
            error!("Sign in request failed: {err}");
            BridgeError::transport(&err, SIGN_IN_FAILED)
        })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        error!("Sign in failed: {} {}", status, error_text);

        let message = if error_text.is_empty() {
            SIGN_IN_FAILED.to_string()
        } else {
            error_text
        };
        return Err(BridgeError::upstream(status, message));
    }

    let policy = state.config().cookie_policy();
    let mut response_headers = HeaderMap::new();

    let upstream_cookies = upstream_session_cookies(response.headers());
    if upstream_cookies.is_empty() {
        warn!("Upstream sign in succeeded without a session cookie");
    }
    for (name, value) in upstream_cookies {
        let cookie = policy
            .build(&name, &value, None)
            .context("Invalid upstream session cookie")?;
        response_headers.append(SET_COOKIE, cookie);
    }

    // A new sign-in always gets a fresh local session id.
    if let Some(previous) = request_cookie(&headers, SESSION_COOKIE_NAME) {
        if let Err(err) = state.sessions().clear_session(&previous) {
            warn!("Failed to clear previous session: {err}");
        }
    }

    let session_id = generate_session_id()?;
    state.sessions().set_session(
        &session_id,
        SessionData {
            authenticated: true,
        },
    )?;
    let session_cookie = policy
        .build(
            SESSION_COOKIE_NAME,
            &session_id,
            Some(state.config().session_ttl_seconds()),
        )
        .context("Failed to build session cookie")?;
    response_headers.append(SET_COOKIE, session_cookie);

    debug!("Local session established");

    Ok((response_headers, Json(SuccessResponse::ok())))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{bridge, json_body, set_cookies};
    use crate::bridge::{
        session::{SessionData, SessionStore},
        state::Environment,
    };
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sign_in_request(body: &serde_json::Value) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method("POST")
            .uri("/api/auth/sign-in")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?)
    }

    fn session_id_from(cookies: &[String]) -> Option<String> {
        cookies
            .iter()
            .find_map(|cookie| cookie.strip_prefix("authbridge_session="))
            .and_then(|rest| rest.split(';').next())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn short_credentials_never_reach_upstream() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let test = bridge(&server.uri(), Environment::Development)?;
        for body in [
            json!({"email": "a@b.co", "password": "short"}),
            json!({"email": "ab", "password": "long-enough-password"}),
            json!({"email": "a@b.co"}),
        ] {
            let response = test.router.clone().oneshot(sign_in_request(&body)?).await?;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(set_cookies(&response).is_empty());
        }
        Ok(())
    }

    #[tokio::test]
    async fn relays_only_upstream_session_cookie() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/sign-in"))
            .and(body_json(
                json!({"email": "user@example.com", "password": "password123"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "x-authenticated=abc123; Path=/; HttpOnly, other=xyz"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let test = bridge(&server.uri(), Environment::Development)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c == "x-authenticated=abc123; Path=/; HttpOnly; SameSite=Lax"));
        assert!(!cookies.iter().any(|c| c.starts_with("other=")));

        let session_id = session_id_from(&cookies);
        assert!(session_id.is_some());
        if let Some(session_id) = session_id {
            assert_eq!(
                test.sessions.get_session(&session_id)?,
                Some(SessionData {
                    authenticated: true
                })
            );
        }

        assert_eq!(json_body(response).await?, json!({"success": true}));
        Ok(())
    }

    #[tokio::test]
    async fn production_cookies_are_secure() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/sign-in"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "x-authenticated=tok; Path=/"),
            )
            .mount(&server)
            .await;

        let test = bridge(&server.uri(), Environment::Production)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.ends_with("; Secure")));
        Ok(())
    }

    #[tokio::test]
    async fn upstream_rejection_keeps_status_and_text() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/sign-in"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let test = bridge(&server.uri(), Environment::Development)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());

        let body = json_body(response).await?;
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["message"], "bad credentials");
        Ok(())
    }

    #[tokio::test]
    async fn empty_rejection_body_uses_default_message() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/sign-in"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let test = bridge(&server.uri(), Environment::Development)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await?["message"], "Failed to sign in");
        Ok(())
    }

    #[tokio::test]
    async fn slow_upstream_times_out_as_internal_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/sign-in"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "x-authenticated=late; Path=/")
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        // The test bridge uses a 2s upstream timeout.
        let test = bridge(&server.uri(), Environment::Development)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookies(&response).is_empty());

        let body = json_body(response).await?;
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Upstream request timed out");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_upstream_is_internal_error() -> Result<()> {
        // Nothing listens on the discard port.
        let test = bridge("http://127.0.0.1:9", Environment::Development)?;
        let response = test
            .router
            .clone()
            .oneshot(sign_in_request(
                &json!({"email": "user@example.com", "password": "password123"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
