//! # Authbridge (session bridge for a web client)
//!
//! `authbridge` sits between a browser client and an upstream authentication
//! API. It forwards sign-in, sign-up and logout actions upstream and translates
//! between the upstream `x-authenticated` session cookie and a local session.
//!
//! ## Session Handling
//!
//! - **Upstream token:** The upstream API issues an opaque `x-authenticated`
//!   cookie on sign-in. The bridge re-issues it to the browser as an
//!   `HttpOnly`, `SameSite=Lax` cookie (plus `Secure` in production) and never
//!   inspects its value.
//! - **Local session:** A separate `authbridge_session` cookie points at a
//!   record in the local [`bridge::session::SessionStore`].
//! - **Logout:** Upstream invalidation is best-effort. Local cookies and the
//!   session record are always cleared, even if the upstream API is down.

pub mod bridge;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
