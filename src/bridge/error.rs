//! Errors surfaced by the bridge handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed input, rejected before any upstream call.
    #[error("{0}")]
    Validation(String),

    /// Upstream answered with a non-success status.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Upstream could not be reached, timed out or the body could not be read.
    #[error("{0}")]
    Transport(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// JSON body returned for every failed bridge request.
#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

impl BridgeError {
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Map a `reqwest` failure, falling back to `default_message` when the
    /// error carries no text.
    pub fn transport(err: &reqwest::Error, default_message: &str) -> Self {
        let message = if err.is_timeout() {
            "Upstream request timed out".to_string()
        } else {
            err.to_string()
        };
        if message.trim().is_empty() {
            Self::Transport(default_message.to_string())
        } else {
            Self::Transport(message)
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status_code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use axum::body::to_bytes;

    #[test]
    fn status_follows_kind() {
        assert_eq!(
            BridgeError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BridgeError::upstream(StatusCode::CONFLICT, "email taken").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BridgeError::Transport("refused".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BridgeError::from(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn into_response_renders_status_and_message() -> Result<()> {
        let response = BridgeError::upstream(StatusCode::UNAUTHORIZED, "bad credentials")
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["statusCode"], 401);
        assert_eq!(value["message"], "bad credentials");
        Ok(())
    }

    #[test]
    fn unexpected_keeps_underlying_message() {
        let err = BridgeError::from(anyhow!("invalid header value"));
        assert_eq!(err.to_string(), "invalid header value");
    }
}
