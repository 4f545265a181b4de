//! Cookie helpers for relaying the upstream session token.
//!
//! Cookies are built as raw `Set-Cookie` header values; no cookie jar is kept.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

/// Cookie carrying the upstream session token, both upstream and locally.
pub const UPSTREAM_COOKIE_NAME: &str = "x-authenticated";

/// Cookie pointing at the local session record.
pub const SESSION_COOKIE_NAME: &str = "authbridge_session";

/// Attributes shared by every cookie the bridge issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Build a `Set-Cookie` value. `max_age` of `None` makes a browser-session cookie.
    pub fn build(
        &self,
        name: &str,
        value: &str,
        max_age: Option<u64>,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
        if let Some(seconds) = max_age {
            cookie.push_str(&format!("; Max-Age={seconds}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Build a `Set-Cookie` value that expires `name` immediately.
    pub fn clear(&self, name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(name, "", Some(0))
    }
}

/// Collect `x-authenticated` pairs from upstream `Set-Cookie` headers.
///
/// Handles both a single comma-joined header and repeated headers. Every
/// other cookie is ignored.
pub fn upstream_session_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter_map(parse_name_value)
        .filter(|(name, _)| name == UPSTREAM_COOKIE_NAME)
        .collect()
}

/// Parse the leading `name=value` of a cookie segment, dropping attributes.
fn parse_name_value(segment: &str) -> Option<(String, String)> {
    let name_value = segment.split(';').next()?;
    let (name, value) = name_value.split_once('=')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

/// Read a cookie from the inbound `Cookie` header.
pub fn request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
