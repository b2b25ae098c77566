// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pure data constants for pagination, rate limiting, networking and Redis
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Cache-related constants (keys, TTLs, stampede guard timings)
pub mod cache;

/// Service names used in structured logging
pub mod service_names {
    /// Server binary and log service name
    pub const CHATRAIL_SERVER: &str = "chatrail-server";
}

/// Network defaults
pub mod network {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 3000;
    /// Default bind host
    pub const DEFAULT_HOST: &str = "0.0.0.0";
}

/// Database defaults
pub mod database {
    /// Default `SQLite` database URL
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/chatrail.db";
    /// Default maximum pool connections
    pub const DEFAULT_POOL_SIZE: u32 = 10;
}

/// Cursor pagination bounds
pub mod pagination {
    /// Hard upper bound for any requested page size
    pub const MAX_PAGE_SIZE: usize = 100;
    /// Lower bound for any requested page size
    pub const MIN_PAGE_SIZE: usize = 1;
    /// Size of the non-paginated window served when full history is disabled
    pub const RECENT_MESSAGES_LIMIT: usize = 10;
}

/// Fixed-window rate limiting
pub mod rate_limiting {
    /// Window length in seconds
    pub const DEFAULT_WINDOW_SECS: u64 = 60;
    /// Key prefix for API request counters
    pub const API_KEY_PREFIX: &str = "api";
}

/// Feature flag sources
pub mod feature_flags {
    /// Default flag file location
    pub const DEFAULT_FLAGS_PATH: &str = "config/feature-flags.yaml";
    /// Environment variable prefix for per-flag overrides
    pub const ENV_OVERRIDE_PREFIX: &str = "FEATURE_FLAG_";
}

/// Redis connection defaults
pub mod redis {
    /// Redis connection timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
    /// Redis response timeout in seconds
    pub const RESPONSE_TIMEOUT_SECS: u64 = 5;
    /// Number of reconnection retries
    pub const RECONNECTION_RETRIES: usize = 5;
    /// Exponential backoff base for retry delays
    pub const RETRY_EXPONENT_BASE: u64 = 2;
    /// Maximum retry delay in milliseconds
    pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
    /// Initial connection retry count
    pub const INITIAL_CONNECTION_RETRIES: u32 = 3;
    /// Initial retry delay in milliseconds
    pub const INITIAL_RETRY_DELAY_MS: u64 = 500;
}
