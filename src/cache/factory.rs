// ABOUTME: Cache factory for environment-based backend selection
// ABOUTME: Adds cache-aside get_or_set_json with lock-guarded recompute on top of the backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::memory::InMemoryCache;
use super::redis::RedisCache;
use super::{CacheConfig, CacheKey, CacheProvider, GetOrSetOptions, LockToken, WindowCount};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Unified cache interface over the configured backend
#[derive(Clone)]
pub enum Cache {
    /// Process-local LRU cache
    Memory(InMemoryCache),
    /// Shared Redis cache
    Redis(RedisCache),
}

macro_rules! dispatch {
    ($self:ident, $cache:ident => $call:expr) => {
        match $self {
            Self::Memory($cache) => $call,
            Self::Redis($cache) => $call,
        }
    };
}

impl Cache {
    /// Create new cache instance based on configuration
    ///
    /// A Redis URL selects the Redis backend, otherwise the in-memory backend is used.
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    pub async fn new(config: CacheConfig) -> AppResult<Self> {
        if config.redis_url.is_some() {
            info!("Initializing Redis cache");
            Ok(Self::Redis(RedisCache::new(config).await?))
        } else {
            info!(
                "Initializing in-memory cache (max entries: {})",
                config.max_entries
            );
            Ok(Self::Memory(InMemoryCache::new(config).await?))
        }
    }

    /// In-memory cache without the background cleanup task
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    pub async fn in_memory() -> AppResult<Self> {
        Self::new(CacheConfig {
            enable_background_cleanup: false,
            ..CacheConfig::default()
        })
        .await
    }

    /// Backend name for health and startup logs
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    /// Store value in cache with TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    pub async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        dispatch!(self, cache => cache.set(key, value, ttl).await)
    }

    /// Retrieve value from cache
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        dispatch!(self, cache => cache.get(key).await)
    }

    /// Remove single cache entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        dispatch!(self, cache => cache.invalidate(key).await)
    }

    /// Check if key exists in cache
    ///
    /// # Errors
    ///
    /// Returns an error if existence check fails
    pub async fn exists(&self, key: &CacheKey) -> AppResult<bool> {
        dispatch!(self, cache => cache.exists(key).await)
    }

    /// Get remaining TTL for key
    ///
    /// # Errors
    ///
    /// Returns an error if TTL check fails
    pub async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>> {
        dispatch!(self, cache => cache.ttl(key).await)
    }

    /// Acquire a lock key if free, returning this acquisition's token
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    pub async fn try_lock(&self, key: &CacheKey, ttl: Duration) -> AppResult<Option<LockToken>> {
        dispatch!(self, cache => cache.try_lock(key, ttl).await)
    }

    /// Release a lock key if it still holds `token`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    pub async fn release_lock(&self, key: &CacheKey, token: &LockToken) -> AppResult<bool> {
        dispatch!(self, cache => cache.release_lock(key, token).await)
    }

    /// Increment a fixed-window counter
    ///
    /// # Errors
    ///
    /// Returns an error if the backend command fails
    pub async fn increment_window(
        &self,
        key: &CacheKey,
        window: Duration,
    ) -> AppResult<WindowCount> {
        dispatch!(self, cache => cache.increment_window(key, window).await)
    }

    /// Verify cache backend is healthy
    ///
    /// # Errors
    ///
    /// Returns an error if health check fails
    pub async fn health_check(&self) -> AppResult<()> {
        dispatch!(self, cache => cache.health_check().await)
    }

    /// Clear all cache entries
    ///
    /// # Errors
    ///
    /// Returns an error if clear operation fails
    pub async fn clear_all(&self) -> AppResult<()> {
        dispatch!(self, cache => cache.clear_all().await)
    }

    /// Cache-aside read with stampede protection
    ///
    /// On a miss only the caller that acquires `{key}:lock` runs `compute` and
    /// stores the result. Other callers poll every `wait_interval` for up to
    /// `wait`, then compute on their own without writing.
    ///
    /// # Errors
    ///
    /// Returns cache backend errors and errors from `compute`
    pub async fn get_or_set_json<T, F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
        options: GetOrSetOptions,
    ) -> AppResult<T>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = AppResult<T>> + Send,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let lock_key = key.lock();
        if let Some(token) = self.try_lock(&lock_key, options.lock_ttl).await? {
            debug!(cache_key = %key, "Cache miss, recomputing under lock");
            let computed = compute().await;
            let stored = match &computed {
                Ok(value) => self.set(key, value, options.ttl).await,
                Err(_) => Ok(()),
            };
            match self.release_lock(&lock_key, &token).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(cache_key = %key, "Cache lock expired before recompute finished");
                }
                Err(e) => warn!(cache_key = %key, error = %e, "Failed to release cache lock"),
            }
            if let Err(e) = stored {
                warn!(cache_key = %key, error = %e, "Failed to store recomputed value");
            }
            return computed;
        }

        let deadline = Instant::now() + options.wait;
        while Instant::now() < deadline {
            tokio::time::sleep(options.wait_interval).await;
            if let Some(value) = self.get(key).await? {
                debug!(cache_key = %key, "Cache filled by lock holder");
                return Ok(value);
            }
        }

        warn!(
            cache_key = %key,
            wait_ms = options.wait.as_millis() as u64,
            "Timed out waiting for cache fill, computing directly"
        );
        compute().await
    }
}
