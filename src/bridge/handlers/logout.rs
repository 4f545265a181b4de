use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::SuccessResponse;
use crate::bridge::{
    cookies::{request_cookie, SESSION_COOKIE_NAME, UPSTREAM_COOKIE_NAME},
    state::BridgeState,
    upstream::best_effort,
};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Local session cleared", body = SuccessResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<BridgeState>>) -> impl IntoResponse {
    if let Some(token) = request_cookie(&headers, UPSTREAM_COOKIE_NAME) {
        let token = SecretString::from(token);
        best_effort("upstream logout", state.upstream().logout(&token)).await;
    } else {
        debug!("No upstream session cookie, skipping upstream logout");
    }

    // Local state is cleared regardless of the upstream outcome.
    if let Some(session_id) = request_cookie(&headers, SESSION_COOKIE_NAME) {
        if let Err(err) = state.sessions().clear_session(&session_id) {
            error!("Failed to clear local session: {err}");
        }
    }

    let policy = state.config().cookie_policy();
    let mut response_headers = HeaderMap::new();
    for name in [UPSTREAM_COOKIE_NAME, SESSION_COOKIE_NAME] {
        match policy.clear(name) {
            Ok(cookie) => {
                response_headers.append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build {name} clearing cookie: {err}"),
        }
    }

    (StatusCode::OK, response_headers, Json(SuccessResponse::ok()))
}
