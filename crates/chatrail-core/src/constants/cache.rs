// ABOUTME: Cache-related constants for keys, TTL, capacity, and cleanup intervals
// ABOUTME: Includes the stampede guard timings used by the cached flag provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Default maximum cache entries for in-memory cache
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1_000;

/// Default cleanup interval in seconds for expired entries
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Key namespace for cached feature flag records (`feature_flags:{env}`)
pub const FEATURE_FLAGS_KEY_PREFIX: &str = "feature_flags";

/// Key namespace for rate limit counters (`ratelimit:{prefix}:{id}`)
pub const RATE_LIMIT_KEY_PREFIX: &str = "ratelimit";

/// Suffix appended to a key to form its recompute lock
pub const LOCK_KEY_SUFFIX: &str = ":lock";

/// Feature flag record TTL
pub const DEFAULT_FLAG_CACHE_TTL_SECS: u64 = 60;

/// Recompute lock TTL; bounds how long a crashed holder can block the key
pub const DEFAULT_LOCK_TTL_MS: u64 = 5_000;

/// How long a non-holder waits for the holder to fill the cache
pub const DEFAULT_WAIT_MS: u64 = 1_000;

/// Poll interval while waiting for the holder
pub const DEFAULT_WAIT_INTERVAL_MS: u64 = 100;
