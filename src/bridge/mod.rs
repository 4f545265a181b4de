use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod cookies;
pub mod error;
pub mod handlers;
mod openapi;
pub mod session;
pub mod state;
pub mod upstream;

pub use openapi::openapi;
pub use state::{BridgeConfig, BridgeState, Environment};

/// Build the bridge router with its shared state attached.
#[must_use]
pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/api/auth/sign-in", post(handlers::sign_in::sign_in))
        .route("/api/auth/logout", post(handlers::logout::logout))
        .route("/api/auth/sign-up/start", post(handlers::sign_up::start))
        .route(
            "/api/auth/sign-up/verify-otp",
            post(handlers::sign_up::verify_otp),
        )
        .route(
            "/api/auth/sign-up/resend-otp",
            post(handlers::sign_up::resend_otp),
        )
        .route(
            "/api/auth/sign-up/complete",
            post(handlers::sign_up::complete),
        )
        .route("/health", get(handlers::health::health))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: BridgeState) -> Result<()> {
    info!(
        "Forwarding auth requests to {} ({:?})",
        state.config().api_base(),
        state.config().environment()
    );

    let app = router(Arc::new(state)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::http::StatusCode;
    use tower::ServiceExt;
    use url::Url;

    #[tokio::test]
    async fn unknown_route_is_not_found() -> Result<()> {
        let state = BridgeState::new(BridgeConfig::new(Url::parse("http://localhost:3001")?))?;
        let response = router(Arc::new(state))
            .oneshot(Request::builder().uri("/api/auth/nope").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_rejects_get() -> Result<()> {
        let state = BridgeState::new(BridgeConfig::new(Url::parse("http://localhost:3001")?))?;
        let response = router(Arc::new(state))
            .oneshot(
                Request::builder()
                    .uri("/api/auth/sign-in")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        Ok(())
    }

    #[test]
    fn make_span_falls_back_to_uri_path() -> Result<()> {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "01HZX")
            .body(Body::empty())?;
        // Span creation must not panic without a matched route.
        let _span = make_span(&request);
        Ok(())
    }
}
