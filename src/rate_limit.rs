//! Rate limiting for abuse-prone endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (10 requests per second)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for self-service profile updates (3 per hour)
    pub profile_update: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create rate limiters with default configuration.
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_second(
                NonZeroU32::new(10).unwrap(),
            ))),
            profile_update: Arc::new(RateLimiter::keyed(Quota::per_hour(
                NonZeroU32::new(3).unwrap(),
            ))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests without a determinable IP share one bucket rather than bypassing
/// the limiter.
fn client_key(request: &Request) -> String {
    extract_client_ip(request.headers(), request.extensions())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.login.check_key(&client_key(&request)) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please wait before trying again.",
        )
            .into_response(),
    }
}

/// Middleware for rate limiting profile updates.
pub async fn rate_limit_profile_update(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.profile_update.check_key(&client_key(&request)) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many API requests from this IP, please try again after 60 min.",
        )
            .into_response(),
    }
}
