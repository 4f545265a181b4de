//! Sign-up relays. Upstream JSON is passed back verbatim on success.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::{json_payload, require_min_chars, valid_email};
use crate::bridge::{
    error::BridgeError,
    state::BridgeState,
    upstream::{
        UpstreamClient, SIGN_UP_COMPLETE_PATH, SIGN_UP_RESEND_OTP_PATH, SIGN_UP_START_PATH,
        SIGN_UP_VERIFY_OTP_PATH,
    },
};

const START_FAILED: &str = "Failed to start sign up";
const VERIFY_FAILED: &str = "Failed to verify OTP";
const RESEND_FAILED: &str = "Failed to resend OTP";
const COMPLETE_FAILED: &str = "Failed to complete sign up";

const OTP_LENGTH: usize = 6;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignUpStartRequest {
    email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    token: String,
    otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendOtpRequest {
    token: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SignUpCompleteRequest {
    username: String,
    password: String,
    token: String,
}

fn require_token(token: &str) -> Result<(), BridgeError> {
    if token.trim().is_empty() {
        return Err(BridgeError::Validation("Missing sign up token".to_string()));
    }
    Ok(())
}

/// POST `body` upstream and relay the JSON answer.
///
/// Failures keep the upstream status and take the message from the body's
/// `message` (or `error.message`) field, else `default_message`.
async fn relay_json<T: Serialize + ?Sized>(
    upstream: &UpstreamClient,
    path: &str,
    body: &T,
    default_message: &str,
) -> Result<Json<Value>, BridgeError> {
    let response = upstream.post_json(path, body).await.map_err(|err| {
        error!("Upstream {path} request failed: {err}");
        BridgeError::transport(&err, default_message)
    })?;

    let status = response.status();
    debug!("Upstream {path} responded with {status}");

    if !status.is_success() {
        let error_data: Value = response.json().await.unwrap_or_else(|_| json!({}));
        error!("Upstream {path} error: {error_data}");
        return Err(BridgeError::upstream(
            status,
            upstream_message(&error_data).unwrap_or(default_message),
        ));
    }

    let data: Value = response
        .json()
        .await
        .map_err(|err| BridgeError::transport(&err, default_message))?;
    Ok(Json(data))
}

fn upstream_message(body: &Value) -> Option<&str> {
    body.get("message")
        .or_else(|| body.get("error").and_then(|error| error.get("message")))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/start",
    request_body = SignUpStartRequest,
    responses(
        (status = 200, description = "Upstream response relayed verbatim"),
        (status = 400, description = "Invalid email", body = crate::bridge::error::ErrorBody),
        (status = 409, description = "Rejected by upstream", body = crate::bridge::error::ErrorBody),
        (status = 500, description = "Upstream unreachable", body = crate::bridge::error::ErrorBody)
    ),
    tag = "sign-up"
)]
#[instrument(skip_all)]
pub async fn start(
    state: Extension<Arc<BridgeState>>,
    payload: Result<Json<SignUpStartRequest>, JsonRejection>,
) -> Result<Json<Value>, BridgeError> {
    let request = json_payload(payload)?;
    if !valid_email(&request.email) {
        return Err(BridgeError::Validation("Invalid email".to_string()));
    }

    relay_json(state.upstream(), SIGN_UP_START_PATH, &request, START_FAILED).await
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Upstream response relayed verbatim"),
        (status = 400, description = "Invalid OTP payload", body = crate::bridge::error::ErrorBody),
        (status = 500, description = "Upstream unreachable", body = crate::bridge::error::ErrorBody)
    ),
    tag = "sign-up"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    state: Extension<Arc<BridgeState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<Value>, BridgeError> {
    let request = json_payload(payload)?;
    require_token(&request.token)?;
    if request.otp.chars().count() != OTP_LENGTH {
        return Err(BridgeError::Validation(format!(
            "OTP must be {OTP_LENGTH} characters"
        )));
    }

    relay_json(
        state.upstream(),
        SIGN_UP_VERIFY_OTP_PATH,
        &request,
        VERIFY_FAILED,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Upstream response relayed verbatim"),
        (status = 400, description = "Missing token", body = crate::bridge::error::ErrorBody),
        (status = 429, description = "Resend throttled upstream", body = crate::bridge::error::ErrorBody)
    ),
    tag = "sign-up"
)]
#[instrument(skip_all)]
pub async fn resend_otp(
    state: Extension<Arc<BridgeState>>,
    payload: Result<Json<ResendOtpRequest>, JsonRejection>,
) -> Result<Json<Value>, BridgeError> {
    let request = json_payload(payload)?;
    require_token(&request.token)?;

    relay_json(
        state.upstream(),
        SIGN_UP_RESEND_OTP_PATH,
        &request,
        RESEND_FAILED,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/complete",
    request_body = SignUpCompleteRequest,
    responses(
        (status = 200, description = "Upstream response relayed verbatim"),
        (status = 400, description = "Invalid sign up payload", body = crate::bridge::error::ErrorBody),
        (status = 500, description = "Upstream unreachable", body = crate::bridge::error::ErrorBody)
    ),
    tag = "sign-up"
)]
#[instrument(skip_all)]
pub async fn complete(
    state: Extension<Arc<BridgeState>>,
    payload: Result<Json<SignUpCompleteRequest>, JsonRejection>,
) -> Result<Json<Value>, BridgeError> {
    let request = json_payload(payload)?;
    require_token(&request.token)?;
    let username_len = request.username.chars().count();
    if !(3..=20).contains(&username_len) {
        return Err(BridgeError::Validation(
            "Username must be between 3 and 20 characters".to_string(),
        ));
    }
    require_min_chars(
        &request.password,
        8,
        "Password must be at least 8 characters",
    )?;

    relay_json(
        state.upstream(),
        SIGN_UP_COMPLETE_PATH,
        &request,
        COMPLETE_FAILED,
    )
    .await
}
