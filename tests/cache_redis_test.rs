// ABOUTME: Integration tests for the Redis cache backend
// ABOUTME: Runs against REDIS_URL when set and skips otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chatrail_server::cache::{Cache, CacheConfig, CacheKey, GetOrSetOptions};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestData {
    value: String,
    count: u32,
}

fn unique_key() -> CacheKey {
    CacheKey::rate_limit("test", Uuid::new_v4().to_string())
}

/// Redis cache from `REDIS_URL`, or None to skip
async fn create_redis_cache() -> Result<Option<Cache>> {
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        println!("REDIS_URL not set, skipping Redis cache tests");
        return Ok(None);
    };

    let config = CacheConfig {
        redis_url: Some(redis_url),
        enable_background_cleanup: false,
        ..CacheConfig::default()
    };

    Ok(Some(Cache::new(config).await?))
}

macro_rules! require_redis {
    ($cache:expr) => {
        match $cache {
            Some(cache) => cache,
            None => {
                println!("Skipping test: Redis not available");
                return Ok(());
            }
        }
    };
}

#[tokio::test]
async fn test_redis_health_check() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    cache.health_check().await?;
    assert_eq!(cache.backend_name(), "redis");
    Ok(())
}

#[tokio::test]
async fn test_redis_set_get_and_invalidate() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = unique_key();
    let data = TestData {
        value: "redis_test".to_owned(),
        count: 7,
    };

    cache.set(&key, &data, Duration::from_secs(30)).await?;
    assert_eq!(cache.get::<TestData>(&key).await?, Some(data));
    assert!(cache.exists(&key).await?);
    assert!(cache.ttl(&key).await?.is_some());

    cache.invalidate(&key).await?;
    assert_eq!(cache.get::<TestData>(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_redis_lock_is_exclusive() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let lock = unique_key().lock();

    let token = cache.try_lock(&lock, Duration::from_secs(5)).await?;
    let token = token.expect("first acquisition holds the lock");
    assert!(cache.try_lock(&lock, Duration::from_secs(5)).await?.is_none());
    assert!(cache.release_lock(&lock, &token).await?);

    let current = cache.try_lock(&lock, Duration::from_secs(5)).await?;
    let current = current.expect("released lock can be taken again");
    // The earlier token no longer matches the stored one
    assert!(!cache.release_lock(&lock, &token).await?);
    assert!(cache.exists(&lock).await?);
    assert!(cache.release_lock(&lock, &current).await?);
    Ok(())
}

#[tokio::test]
async fn test_redis_window_counter() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = unique_key();

    let first = cache.increment_window(&key, Duration::from_secs(60)).await?;
    let second = cache.increment_window(&key, Duration::from_secs(60)).await?;

    assert_eq!(first.count, 1);
    assert_eq!(second.count, 2);
    assert!(second.reset_in <= Duration::from_secs(60));
    cache.invalidate(&key).await?;
    Ok(())
}

#[tokio::test]
async fn test_redis_get_or_set_computes_once() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = unique_key();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = GetOrSetOptions {
        ttl: Duration::from_secs(30),
        lock_ttl: Duration::from_secs(5),
        wait: Duration::from_secs(3),
        wait_interval: Duration::from_millis(20),
    };

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_set_json(
                        &key,
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(42_u64)
                        },
                        options,
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await??, 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    cache.invalidate(&key).await?;
    Ok(())
}
