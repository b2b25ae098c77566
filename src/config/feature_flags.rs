// ABOUTME: Feature flag source configuration (file path, env overrides, cache-aside timings)
// ABOUTME: Supplies the settings consumed when the flag provider chain is assembled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{env_flag, env_or};
use crate::constants::{cache, feature_flags};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Where flags come from and how long they are cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlagConfig {
    /// Flag file with `key: value` lines
    pub path: PathBuf,
    /// Layer `FEATURE_FLAG_<KEY>` environment overrides over the file
    pub env_overrides: bool,
    /// Wrap the provider chain in the shared cache
    pub cache_enabled: bool,
    /// TTL of the cached flag record in seconds
    pub cache_ttl_secs: u64,
    /// TTL of the recompute lock in milliseconds
    pub lock_ttl_ms: u64,
    /// Maximum wait for another instance to fill the cache in milliseconds
    pub wait_ms: u64,
    /// Poll interval while waiting in milliseconds
    pub wait_interval_ms: u64,
}

impl Default for FeatureFlagConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(feature_flags::DEFAULT_FLAGS_PATH),
            env_overrides: true,
            cache_enabled: true,
            cache_ttl_secs: cache::DEFAULT_FLAG_CACHE_TTL_SECS,
            lock_ttl_ms: cache::DEFAULT_LOCK_TTL_MS,
            wait_ms: cache::DEFAULT_WAIT_MS,
            wait_interval_ms: cache::DEFAULT_WAIT_INTERVAL_MS,
        }
    }
}

impl FeatureFlagConfig {
    /// Load flag source configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            path: env::var("FEATURE_FLAGS_PATH")
                .map_or_else(|_| PathBuf::from(feature_flags::DEFAULT_FLAGS_PATH), PathBuf::from),
            env_overrides: env_flag("FEATURE_FLAGS_ENV_OVERRIDES", true),
            cache_enabled: env_flag("FEATURE_FLAGS_CACHE_ENABLED", true),
            cache_ttl_secs: env_or(
                "FEATURE_FLAGS_CACHE_TTL_SECS",
                cache::DEFAULT_FLAG_CACHE_TTL_SECS,
            ),
            lock_ttl_ms: env_or("FEATURE_FLAGS_LOCK_TTL_MS", cache::DEFAULT_LOCK_TTL_MS),
            wait_ms: env_or("FEATURE_FLAGS_WAIT_MS", cache::DEFAULT_WAIT_MS),
            wait_interval_ms: env_or(
                "FEATURE_FLAGS_WAIT_INTERVAL_MS",
                cache::DEFAULT_WAIT_INTERVAL_MS,
            ),
        }
    }

    /// Cached record TTL
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
