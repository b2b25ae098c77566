// ABOUTME: Rate limiting middleware for authenticated HTTP requests
// ABOUTME: Adds X-RateLimit headers to every response and rejects over-budget requests with 429
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting Middleware with HTTP Headers
//!
//! Runs after [`super::require_auth`], counting one request per call against
//! the caller's fixed window.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderValue};

use crate::auth::AuthenticatedUser;
use crate::context::ServerContext;
use crate::errors::AppError;
use crate::rate_limiting::RateLimitResult;

/// HTTP header names for rate limiting
pub mod headers {
    /// Requests allowed per window
    pub const X_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    /// Requests left in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds until the current window resets
    pub const X_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
    /// Seconds to wait before retrying a rejected request
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Create a `HeaderMap` with rate limit headers
#[must_use]
pub fn create_rate_limit_headers(result: &RateLimitResult) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(headers::X_RATE_LIMIT_LIMIT, HeaderValue::from(result.limit));
    map.insert(
        headers::X_RATE_LIMIT_REMAINING,
        HeaderValue::from(result.remaining),
    );
    map.insert(
        headers::X_RATE_LIMIT_RESET,
        HeaderValue::from(result.reset_in_seconds),
    );
    if result.limited {
        map.insert(headers::RETRY_AFTER, HeaderValue::from(result.reset_in_seconds));
    }
    map
}

/// Count the request against the caller's window
pub async fn rate_limit(
    State(context): State<ServerContext>,
    req: Request,
    next: Next,
) -> Response {
    let Some(user) = req.extensions().get::<AuthenticatedUser>().cloned() else {
        return AppError::auth_required().into_response();
    };

    let result = match context.rate_limiter().check(&user.id).await {
        Ok(result) => result,
        Err(error) => return error.into_response(),
    };
    let limit_headers = create_rate_limit_headers(&result);

    if result.limited {
        tracing::warn!(
            user_id = %user.id,
            limit = result.limit,
            reset_in_seconds = result.reset_in_seconds,
            "Rate limit exceeded"
        );
        return (limit_headers, result.to_error()).into_response();
    }

    let mut response = next.run(req).await;
    response.headers_mut().extend(limit_headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_for_limited_result() {
        let map = create_rate_limit_headers(&RateLimitResult {
            limited: true,
            limit: 2,
            remaining: 0,
            reset_in_seconds: 42,
        });
        assert_eq!(map[headers::X_RATE_LIMIT_LIMIT], "2");
        assert_eq!(map[headers::X_RATE_LIMIT_REMAINING], "0");
        assert_eq!(map[headers::RETRY_AFTER], "42");
    }

    #[test]
    fn test_no_retry_after_when_allowed() {
        let map = create_rate_limit_headers(&RateLimitResult {
            limited: false,
            limit: 60,
            remaining: 59,
            reset_in_seconds: 60,
        });
        assert!(!map.contains_key(headers::RETRY_AFTER));
        assert_eq!(map[headers::X_RATE_LIMIT_RESET], "60");
    }
}
