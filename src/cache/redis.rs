// ABOUTME: Redis cache implementation with connection management and TTL support
// ABOUTME: Provides shared flag caching, SET NX locks and INCR counters across instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{CacheConfig, CacheKey, CacheProvider, LockToken, WindowCount};
use crate::config::RedisConnectionConfig;
use crate::constants::cache::{FEATURE_FLAGS_KEY_PREFIX, RATE_LIMIT_KEY_PREFIX};
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis cache implementation
///
/// Keys are written verbatim (`feature_flags:{env}`, `ratelimit:{scope}:{id}`) so
/// every server instance pointed at the same Redis shares them.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

/// Deletes the lock only while it still holds the caller's token
const RELEASE_LOCK_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Command failures mean the shared cache is unreachable or misbehaving
fn cache_error(operation: &str, e: &redis::RedisError) -> AppError {
    error!("Redis {} operation failed: {}", operation, e);
    AppError::service_unavailable("redis", format!("{operation} failed: {e}"))
}

impl RedisCache {
    async fn new_with_config(config: &CacheConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for Redis cache backend"))?;

        let conn_config = &config.redis_connection;
        info!(
            "Connecting to Redis (timeout={}s, response_timeout={}s, retries={})",
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::config(format!("Failed to create Redis client: {e}")))?;
        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");
        Ok(Self { manager })
    }

    /// Connect to Redis with exponential backoff retry on failure
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_exponent_base(conn_config.retry_exponent_base)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::service_unavailable(
            "redis",
            format!(
                "Failed to connect after {} attempts: {}",
                max_retries + 1,
                last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
            ),
        ))
    }

    async fn delete_matching(&self, pattern: &str) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        let mut cursor = 0u64;
        let mut deleted = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| cache_error("SCAN", &e))?;

            if !keys.is_empty() {
                let removed: u64 = conn.del(&keys).await.map_err(|e| cache_error("DEL", &e))?;
                deleted += removed;
            }

            cursor = next_cursor;
            if cursor == 0 {
                return Ok(deleted);
            }
        }
    }
}

#[async_trait::async_trait]
impl CacheProvider for RedisCache {
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized,
    {
        Self::new_with_config(&config).await
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let serialized = serde_json::to_vec(value)
            .map_err(|e| AppError::serialization(format!("Cache serialization failed: {e}")))?;
        let mut conn = self.manager.clone();

        // SETEX rejects a zero expiry
        conn.set_ex::<_, _, ()>(key.to_string(), serialized, ttl.as_secs().max(1))
            .await
            .map_err(|e| cache_error("SETEX", &e))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = conn
            .get(key.to_string())
            .await
            .map_err(|e| cache_error("GET", &e))?;

        data.map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| {
                AppError::serialization(format!("Cache deserialization failed: {e}"))
            })
        })
        .transpose()
    }

    async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key.to_string())
            .await
            .map_err(|e| cache_error("DEL", &e))
    }

    async fn exists(&self, key: &CacheKey) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        conn.exists(key.to_string())
            .await
            .map_err(|e| cache_error("EXISTS", &e))
    }

    async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>> {
        let mut conn = self.manager.clone();
        let ttl_secs: i64 = conn
            .ttl(key.to_string())
            .await
            .map_err(|e| cache_error("TTL", &e))?;

        // -2: missing key, -1: no expiry
        Ok((ttl_secs > 0).then(|| Duration::from_secs(ttl_secs as u64)))
    }

    async fn try_lock(&self, key: &CacheKey, ttl: Duration) -> AppResult<Option<LockToken>> {
        let mut conn = self.manager.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let token = LockToken::generate();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key.to_string())
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("SET NX", &e))?;

        Ok(reply.map(|_| token))
    }

    async fn release_lock(&self, key: &CacheKey, token: &LockToken) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(key.to_string())
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| cache_error("EVALSHA", &e))?;
        Ok(deleted == 1)
    }

    async fn increment_window(&self, key: &CacheKey, window: Duration) -> AppResult<WindowCount> {
        let redis_key = key.to_string();
        let window_secs = window.as_secs().max(1);
        let mut conn = self.manager.clone();

        let count: u64 = conn
            .incr(&redis_key, 1)
            .await
            .map_err(|e| cache_error("INCR", &e))?;
        if count == 1 {
            conn.expire::<_, ()>(&redis_key, window_secs as i64)
                .await
                .map_err(|e| cache_error("EXPIRE", &e))?;
        }

        let ttl_secs: i64 = conn
            .ttl(&redis_key)
            .await
            .map_err(|e| cache_error("TTL", &e))?;
        let reset_secs = if ttl_secs > 0 {
            ttl_secs as u64
        } else {
            window_secs
        };

        Ok(WindowCount {
            count,
            reset_in: Duration::from_secs(reset_secs),
        })
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("PING", &e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::service_unavailable(
                "redis",
                format!("unexpected PING response '{response}'"),
            ))
        }
    }

    async fn clear_all(&self) -> AppResult<()> {
        // Only our own namespaces; the Redis instance may be shared
        for prefix in [FEATURE_FLAGS_KEY_PREFIX, RATE_LIMIT_KEY_PREFIX] {
            let deleted = self.delete_matching(&format!("{prefix}:*")).await?;
            tracing::debug!(prefix, deleted, "Cleared cache namespace");
        }
        Ok(())
    }
}
