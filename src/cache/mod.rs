// ABOUTME: Cache abstraction layer shared by feature flags, locks and rate limiting
// ABOUTME: Pluggable backend support (in-memory, Redis) behind the CacheProvider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Cache factory for creating cache providers
pub mod factory;
/// In-memory cache implementation
pub mod memory;
/// Redis cache implementation
pub mod redis;

pub use factory::Cache;

use crate::config::{CacheSettings, RedisConnectionConfig};
use crate::constants::cache::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_FLAG_CACHE_TTL_SECS,
    DEFAULT_LOCK_TTL_MS, DEFAULT_WAIT_INTERVAL_MS, DEFAULT_WAIT_MS, FEATURE_FLAGS_KEY_PREFIX,
    LOCK_KEY_SUFFIX, RATE_LIMIT_KEY_PREFIX,
};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Cache provider trait for pluggable backend implementations
///
/// Values are stored as JSON. Locks and window counters are stored under their
/// own keys and share the keyspace with regular values.
///
/// # Examples
///
/// ```rust,no_run
/// use chatrail_server::cache::{CacheConfig, CacheKey, CacheProvider};
/// use chatrail_server::cache::memory::InMemoryCache;
/// use std::time::Duration;
/// # async fn example() -> Result<(), chatrail_server::errors::AppError> {
///
/// let config = CacheConfig {
///     enable_background_cleanup: false,
///     ..Default::default()
/// };
/// let cache = InMemoryCache::new(config).await?;
///
/// let key = CacheKey::feature_flags("development");
/// cache.set(&key, &"cached", Duration::from_secs(60)).await?;
/// let cached: Option<String> = cache.get(&key).await?;
/// assert_eq!(cached.as_deref(), Some("cached"));
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait CacheProvider: Send + Sync + Clone {
    /// Create new cache instance with configuration
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Store value in cache with TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Retrieve value from cache
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>>;

    /// Remove single cache entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    async fn invalidate(&self, key: &CacheKey) -> AppResult<()>;

    /// Check if key exists in cache
    ///
    /// # Errors
    ///
    /// Returns an error if existence check fails
    async fn exists(&self, key: &CacheKey) -> AppResult<bool>;

    /// Get remaining TTL for key
    ///
    /// # Errors
    ///
    /// Returns an error if TTL check fails
    async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>>;

    /// Acquire a lock key if nobody holds it (`SET NX` with expiry)
    ///
    /// Returns the token of this acquisition when the caller now holds the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    async fn try_lock(&self, key: &CacheKey, ttl: Duration) -> AppResult<Option<LockToken>>;

    /// Release a lock key if it still holds `token`
    ///
    /// Returns `false` when the lock expired or was taken over by another
    /// caller, in which case it is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    async fn release_lock(&self, key: &CacheKey, token: &LockToken) -> AppResult<bool>;

    /// Increment a fixed-window counter, starting the window on the first hit
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    async fn increment_window(&self, key: &CacheKey, window: Duration) -> AppResult<WindowCount>;

    /// Verify cache backend is healthy
    ///
    /// # Errors
    ///
    /// Returns an error if health check fails
    async fn health_check(&self) -> AppResult<()>;

    /// Clear all cache entries (for testing/admin)
    ///
    /// # Errors
    ///
    /// Returns an error if clear operation fails
    async fn clear_all(&self) -> AppResult<()>;
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (for in-memory cache)
    pub max_entries: usize,
    /// Redis connection URL (for Redis cache)
    pub redis_url: Option<String>,
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
    /// Enable background cleanup task (disabled in tests)
    pub enable_background_cleanup: bool,
    /// Redis connection and retry configuration
    pub redis_connection: RedisConnectionConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            redis_url: None,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            redis_url: settings.redis_url.clone(),
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            enable_background_cleanup: true,
            redis_connection: settings.redis_connection.clone(),
        }
    }
}

/// Structured cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Merged feature flag record for one deployment environment
    FeatureFlags {
        /// Environment name (development, production, ...)
        environment: String,
    },
    /// Recompute lock guarding another key
    Lock(Box<CacheKey>),
    /// Fixed-window request counter
    RateLimit {
        /// Limiter scope (`api`)
        scope: String,
        /// Caller identity, usually the user id
        identifier: String,
    },
}

impl CacheKey {
    /// Key of the flag record for `environment`
    #[must_use]
    pub fn feature_flags(environment: impl Into<String>) -> Self {
        Self::FeatureFlags {
            environment: environment.into(),
        }
    }

    /// Key of the rate limit counter for `identifier` within `scope`
    #[must_use]
    pub fn rate_limit(scope: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::RateLimit {
            scope: scope.into(),
            identifier: identifier.into(),
        }
    }

    /// Lock key guarding this key
    #[must_use]
    pub fn lock(&self) -> Self {
        Self::Lock(Box::new(self.clone()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureFlags { environment } => {
                write!(f, "{FEATURE_FLAGS_KEY_PREFIX}:{environment}")
            }
            Self::Lock(inner) => write!(f, "{inner}{LOCK_KEY_SUFFIX}"),
            Self::RateLimit { scope, identifier } => {
                write!(f, "{RATE_LIMIT_KEY_PREFIX}:{scope}:{identifier}")
            }
        }
    }
}

/// Value stored under a lock key by one acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    /// Fresh random token
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Token text as stored in the cache
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Counter state after a fixed-window increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Hits in the current window, including this one
    pub count: u64,
    /// Time until the window resets
    pub reset_in: Duration,
}

/// Timings for [`Cache::get_or_set_json`]
#[derive(Debug, Clone, Copy)]
pub struct GetOrSetOptions {
    /// TTL of the stored value
    pub ttl: Duration,
    /// TTL of the recompute lock
    pub lock_ttl: Duration,
    /// Maximum time a non-holder waits for the value to appear
    pub wait: Duration,
    /// Poll interval while waiting
    pub wait_interval: Duration,
}

impl Default for GetOrSetOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_FLAG_CACHE_TTL_SECS),
            lock_ttl: Duration::from_millis(DEFAULT_LOCK_TTL_MS),
            wait: Duration::from_millis(DEFAULT_WAIT_MS),
            wait_interval: Duration::from_millis(DEFAULT_WAIT_INTERVAL_MS),
        }
    }
}
