//! Bearer header parsing for authentication.

use axum::http::{HeaderMap, HeaderName};

/// Marker prefix for token header values.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract a bearer token from the named header. Returns None when the
/// header is absent, unreadable, or not bearer-prefixed.
pub fn bearer_token<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() { None } else { Some(token) }
}
