//! Bridge handlers and shared request helpers.
//!
//! Each handler validates its payload locally, makes exactly one upstream
//! call and maps the outcome back to the caller. Nothing is retried.

pub mod health;
pub mod logout;
pub mod sign_in;
pub mod sign_up;

use axum::{extract::rejection::JsonRejection, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::BridgeError;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Lightweight email syntax check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Unwrap a JSON body, turning any rejection into a validation error.
pub(crate) fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, BridgeError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| BridgeError::Validation(rejection.body_text()))
}

/// Fail with `message` unless `value` has at least `min` characters.
pub(crate) fn require_min_chars(value: &str, min: usize, message: &str) -> Result<(), BridgeError> {
    if value.chars().count() < min {
        return Err(BridgeError::Validation(message.to_string()));
    }
    Ok(())
}
