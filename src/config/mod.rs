// ABOUTME: Configuration management module for server, cache and feature flag settings
// ABOUTME: All configuration is read from environment variables with typed defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-only configuration
//!
//! Every setting has a default so the server starts with an empty environment.
//! Invalid numeric values fall back to the default instead of failing startup.

/// Cache backend and Redis connection settings
pub mod cache;
/// Top-level server configuration
pub mod environment;
/// Feature flag source and cache settings
pub mod feature_flags;

pub use cache::{CacheSettings, RedisConnectionConfig};
pub use environment::{DatabaseSettings, ServerConfig};
pub use feature_flags::FeatureFlagConfig;

use std::env;
use std::str::FromStr;

/// Read and parse an environment variable, falling back to `default`
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean environment variable (`true`/`1`/`yes`/`on`)
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}
