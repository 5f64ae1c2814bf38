//! Rate limiting for API endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking. Authentication
//! endpoints get a strict tier to slow down credential stuffing; the rest
//! of the API shares a generous general tier.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for credential endpoints (strict: 5 burst, 1 per second)
    pub auth: Arc<IpLimiter>,
    /// Per-IP limiter for everything else (generous: 50 burst, 25 per second)
    pub general: Arc<IpLimiter>,
    /// Header carrying the client IP when running behind a trusted proxy.
    /// When unset, the socket peer address is used.
    pub trusted_ip_header: Option<HeaderName>,
}

impl RateLimitConfig {
    /// Create rate limiters with default quotas.
    /// In test mode, limits are much higher to allow rapid test execution.
    pub fn new(trusted_ip_header: Option<HeaderName>) -> Self {
        #[cfg(feature = "test-mode")]
        const AUTH_PER_SEC: u32 = 1000;
        #[cfg(not(feature = "test-mode"))]
        const AUTH_PER_SEC: u32 = 1;

        #[cfg(feature = "test-mode")]
        const AUTH_BURST: u32 = 1000;
        #[cfg(not(feature = "test-mode"))]
        const AUTH_BURST: u32 = 5;

        #[cfg(feature = "test-mode")]
        const GENERAL_PER_SEC: u32 = 10000;
        #[cfg(not(feature = "test-mode"))]
        const GENERAL_PER_SEC: u32 = 25;

        #[cfg(feature = "test-mode")]
        const GENERAL_BURST: u32 = 10000;
        #[cfg(not(feature = "test-mode"))]
        const GENERAL_BURST: u32 = 50;

        Self {
            auth: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(AUTH_PER_SEC).unwrap())
                    .allow_burst(NonZeroU32::new(AUTH_BURST).unwrap()),
            )),
            general: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(GENERAL_PER_SEC).unwrap())
                    .allow_burst(NonZeroU32::new(GENERAL_BURST).unwrap()),
            )),
            trusted_ip_header,
        }
    }
}

/// Extract the client IP for rate limit keying.
///
/// With a trusted proxy header configured, the header must be present and
/// parseable; there is no fallback to the socket address. Without one, the
/// socket peer address from `ConnectInfo` is used.
fn client_ip(request: &Request, trusted_header: Option<&HeaderName>) -> Result<String, &'static str> {
    if let Some(name) = trusted_header {
        let value = request
            .headers()
            .get(name)
            .ok_or("IP header not present")?
            .to_str()
            .map_err(|_| "IP header contains invalid characters")?;
        // X-Forwarded-For lists the client first
        let ip = value.split(',').next().unwrap_or("").trim();
        if ip.is_empty() {
            return Err("IP header is empty");
        }
        return Ok(ip.to_string());
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ci) => Ok(ci.0.ip().to_string()),
        None if cfg!(feature = "test-mode") => Ok("local".to_string()),
        None => Err("No client IP available"),
    }
}

fn check(limiter: &IpLimiter, request: &Request, config: &RateLimitConfig) -> Result<(), Response> {
    let ip = match client_ip(request, config.trusted_ip_header.as_ref()) {
        Ok(ip) => ip,
        Err(_) => {
            return Err(
                (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response(),
            );
        }
    };

    limiter.check_key(&ip).map_err(|_| {
        (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
            .into_response()
    })
}

/// Middleware for rate limiting credential endpoints.
pub async fn rate_limit_auth(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config.auth, &request, &config) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting the general API surface.
pub async fn rate_limit_general(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config.general, &request, &config) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_header(name: &str, value: &str) -> Request {
        Request::builder()
            .uri("/")
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn trusted_header_takes_first_forwarded_ip() {
        let header = HeaderName::from_static("x-forwarded-for");
        let request = request_with_header("x-forwarded-for", "203.0.113.9, 10.0.0.1");
        assert_eq!(
            client_ip(&request, Some(&header)),
            Ok("203.0.113.9".to_string())
        );
    }

    #[test]
    fn missing_trusted_header_is_an_error() {
        let header = HeaderName::from_static("x-real-ip");
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(client_ip(&request, Some(&header)).is_err());
    }

    #[test]
    fn empty_trusted_header_is_an_error() {
        let header = HeaderName::from_static("x-forwarded-for");
        let request = request_with_header("x-forwarded-for", " , 10.0.0.1");
        assert!(client_ip(&request, Some(&header)).is_err());
    }
}
