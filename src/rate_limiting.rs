// ABOUTME: Fixed-window per-user rate limiting backed by the shared cache
// ABOUTME: The per-window budget is read from RATE_LIMIT_PER_MINUTE on every check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting
//!
//! Each user has one counter per window under `ratelimit:{prefix}:{user_id}`.
//! The first hit of a window sets its expiry; a request is limited once the
//! counter exceeds the budget.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::{Cache, CacheKey};
use crate::constants::rate_limiting::API_KEY_PREFIX;
use crate::errors::{AppError, AppResult};
use crate::feature_flags::{FeatureFlag, FeatureFlagService};

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    /// Whether the request must be rejected
    pub limited: bool,
    /// Budget per window
    pub limit: u64,
    /// Requests left in the window
    pub remaining: u64,
    /// Seconds until the window resets
    pub reset_in_seconds: u64,
}

impl RateLimitResult {
    /// Error to return for a limited request
    #[must_use]
    pub fn to_error(&self) -> AppError {
        AppError::rate_limit_exceeded(self.limit, self.reset_in_seconds)
    }
}

/// Fixed-window limiter keyed by user id
#[derive(Clone)]
pub struct RateLimiter {
    cache: Cache,
    flags: FeatureFlagService,
    window: Duration,
}

impl RateLimiter {
    /// Limiter for API requests with the given window length
    #[must_use]
    pub fn new(cache: Cache, flags: FeatureFlagService, window: Duration) -> Self {
        Self {
            cache,
            flags,
            window,
        }
    }

    /// Window length
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn key(identifier: &str) -> CacheKey {
        CacheKey::rate_limit(API_KEY_PREFIX, identifier)
    }

    async fn limit(&self) -> AppResult<u64> {
        Ok(self.flags.get_usize(FeatureFlag::RateLimitPerMinute).await? as u64)
    }

    /// Count one request for `identifier`
    ///
    /// # Errors
    ///
    /// Returns an error if flags or the cache are unavailable
    pub async fn check(&self, identifier: &str) -> AppResult<RateLimitResult> {
        let limit = self.limit().await?;
        self.check_with_limit(identifier, limit).await
    }

    /// Count one request for `identifier` against an explicit budget
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unavailable
    pub async fn check_with_limit(&self, identifier: &str, limit: u64) -> AppResult<RateLimitResult> {
        let window = self
            .cache
            .increment_window(&Self::key(identifier), self.window)
            .await?;

        let result = RateLimitResult {
            limited: window.count > limit,
            limit,
            remaining: limit.saturating_sub(window.count),
            reset_in_seconds: self.reset_seconds(Some(window.reset_in)),
        };
        if result.limited {
            debug!(identifier, count = window.count, limit, "Rate limit exceeded");
        }
        Ok(result)
    }

    /// Current standing of `identifier` without counting a request
    ///
    /// A caller that has used the whole budget is reported as limited, since
    /// its next request would be rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if flags or the cache are unavailable
    pub async fn status(&self, identifier: &str) -> AppResult<RateLimitResult> {
        let limit = self.limit().await?;
        let key = Self::key(identifier);
        let count = self.cache.get::<u64>(&key).await?.unwrap_or(0);
        let ttl = self.cache.ttl(&key).await?;

        Ok(RateLimitResult {
            limited: count >= limit,
            limit,
            remaining: limit.saturating_sub(count),
            reset_in_seconds: self.reset_seconds(ttl),
        })
    }

    /// Whole seconds until reset, the full window when the TTL is unknown
    fn reset_seconds(&self, ttl: Option<Duration>) -> u64 {
        ttl.filter(|ttl| !ttl.is_zero())
            .map_or(self.window.as_secs(), |ttl| {
                ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)
            })
    }
}
