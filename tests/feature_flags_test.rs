// ABOUTME: Integration tests for feature flag providers and typed evaluation
// ABOUTME: Covers file loading, env overrides, composite merge and cache stampede protection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatrail_server::cache::{Cache, CacheKey, GetOrSetOptions};
use chatrail_server::config::FeatureFlagConfig;
use chatrail_server::errors::{AppResult, ErrorCode};
use chatrail_server::feature_flags::{
    build_provider, CachedFlagProvider, CompositeFlagProvider, EnvFlagProvider, FeatureFlag,
    FeatureFlagRecord, FeatureFlagService, FileFlagProvider, FlagProvider, FlagValue,
    RawFlagValue, StaticFlagProvider,
};
use serial_test::serial;
use tempfile::NamedTempFile;

fn flag_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Provider that counts fetches and answers slowly
struct SlowCountingProvider {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait::async_trait]
impl FlagProvider for SlowCountingProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let mut record = FeatureFlagRecord::new();
        record.insert("PAGINATION_LIMIT".to_owned(), RawFlagValue::Number(42.0));
        Ok(record)
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

// ============================================================================
// File provider
// ============================================================================

#[tokio::test]
async fn test_file_provider_parses_scalars() {
    common::init_test_logging();
    let file = flag_file(
        "# flags\nSTREAMING_ENABLED: false\nPAGINATION_LIMIT: 15 # capped\nnot a flag line\nCHAT_HISTORY_LIMIT: \"12\"\n",
    );
    let provider = FileFlagProvider::new(file.path());

    let record = provider.get_flags().await.unwrap();
    assert_eq!(record.get("STREAMING_ENABLED"), Some(&RawFlagValue::Bool(false)));
    assert_eq!(record.get("PAGINATION_LIMIT"), Some(&RawFlagValue::Number(15.0)));
    assert_eq!(record.get("CHAT_HISTORY_LIMIT"), Some(&RawFlagValue::Number(12.0)));
    assert_eq!(record.len(), 3);
}

#[tokio::test]
async fn test_file_provider_reads_once() {
    common::init_test_logging();
    let file = flag_file("PAGINATION_LIMIT: 15\n");
    let provider = FileFlagProvider::new(file.path());
    assert_eq!(
        provider.get_flags().await.unwrap().get("PAGINATION_LIMIT"),
        Some(&RawFlagValue::Number(15.0))
    );

    std::fs::write(file.path(), "PAGINATION_LIMIT: 30\n").unwrap();
    assert_eq!(
        provider.get_flags().await.unwrap().get("PAGINATION_LIMIT"),
        Some(&RawFlagValue::Number(15.0))
    );
}

#[tokio::test]
async fn test_missing_file_is_a_config_error() {
    common::init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let provider = FileFlagProvider::new(dir.path().join("missing.yaml"));

    let error = provider.get_flags().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigError);
}

// ============================================================================
// Composite and environment providers
// ============================================================================

#[tokio::test]
async fn test_composite_later_providers_win() {
    let base = StaticFlagProvider::default();
    base.set(FeatureFlag::PaginationLimit, 30).await;
    base.set(FeatureFlag::AiToolsEnabled, true).await;
    let overrides = StaticFlagProvider::default();
    overrides.set(FeatureFlag::PaginationLimit, 15).await;

    let composite = CompositeFlagProvider::new(vec![Arc::new(base), Arc::new(overrides)]);
    let record = composite.get_flags().await.unwrap();

    assert_eq!(record.get("PAGINATION_LIMIT"), Some(&RawFlagValue::Number(15.0)));
    assert_eq!(record.get("AI_TOOLS_ENABLED"), Some(&RawFlagValue::Bool(true)));
}

#[tokio::test]
#[serial]
async fn test_env_overrides_file_values() {
    common::init_test_logging();
    let file = flag_file("PAGINATION_LIMIT: 30\nSTREAMING_ENABLED: true\n");
    std::env::set_var("FEATURE_FLAG_PAGINATION_LIMIT", "15");
    std::env::set_var("FEATURE_FLAG_STREAMING_ENABLED", "off");

    let composite: Arc<dyn FlagProvider> = Arc::new(CompositeFlagProvider::new(vec![
        Arc::new(FileFlagProvider::new(file.path())),
        Arc::new(EnvFlagProvider::default()),
    ]));
    let service = FeatureFlagService::new(composite);

    let limit = service.get_usize(FeatureFlag::PaginationLimit).await;
    let streaming = service.is_enabled(FeatureFlag::StreamingEnabled).await;

    std::env::remove_var("FEATURE_FLAG_PAGINATION_LIMIT");
    std::env::remove_var("FEATURE_FLAG_STREAMING_ENABLED");

    assert_eq!(limit.unwrap(), 15);
    assert!(!streaming.unwrap());
}

// ============================================================================
// Cached provider
// ============================================================================

#[tokio::test]
async fn test_concurrent_misses_fetch_once() {
    common::init_test_logging();
    let inner = Arc::new(SlowCountingProvider {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(100),
    });
    let cache = Cache::in_memory().await.unwrap();
    let options = GetOrSetOptions {
        ttl: Duration::from_secs(60),
        lock_ttl: Duration::from_secs(5),
        wait: Duration::from_secs(3),
        wait_interval: Duration::from_millis(10),
    };
    let provider = Arc::new(CachedFlagProvider::new(
        inner.clone(),
        cache,
        "test",
        options,
    ));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get_flags().await })
        })
        .collect();
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.get("PAGINATION_LIMIT"), Some(&RawFlagValue::Number(42.0)));
    }

    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.key().to_string(), "feature_flags:test");
}

#[tokio::test]
async fn test_cached_record_is_reused_until_invalidated() {
    let inner = Arc::new(SlowCountingProvider {
        calls: AtomicUsize::new(0),
        delay: Duration::ZERO,
    });
    let cache = Cache::in_memory().await.unwrap();
    let provider = CachedFlagProvider::new(inner.clone(), cache.clone(), "test", GetOrSetOptions::default());

    provider.get_flags().await.unwrap();
    provider.get_flags().await.unwrap();
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

    cache
        .invalidate(&CacheKey::feature_flags("test"))
        .await
        .unwrap();
    provider.get_flags().await.unwrap();
    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_build_provider_without_env_or_cache() {
    common::init_test_logging();
    let file = flag_file("RATE_LIMIT_PER_MINUTE: 5\n");
    let config = FeatureFlagConfig {
        path: file.path().to_path_buf(),
        env_overrides: false,
        cache_enabled: false,
        ..FeatureFlagConfig::default()
    };
    let cache = Cache::in_memory().await.unwrap();

    let provider = build_provider(&config, &cache, "test");
    assert_eq!(provider.name(), "file");

    let service = FeatureFlagService::new(provider);
    assert_eq!(service.get_usize(FeatureFlag::RateLimitPerMinute).await.unwrap(), 5);
}

// ============================================================================
// Typed evaluation
// ============================================================================

#[tokio::test]
async fn test_defaults_apply_when_unset() {
    let service = FeatureFlagService::new(Arc::new(StaticFlagProvider::default()));

    assert!(service.is_enabled(FeatureFlag::StreamingEnabled).await.unwrap());
    assert!(!service.is_enabled(FeatureFlag::AiToolsEnabled).await.unwrap());
    assert!(service.is_enabled(FeatureFlag::ChatHistoryEnabled).await.unwrap());
    assert_eq!(service.get_usize(FeatureFlag::PaginationLimit).await.unwrap(), 20);
    assert_eq!(service.get_usize(FeatureFlag::ChatHistoryLimit).await.unwrap(), 10);
    assert_eq!(service.get_usize(FeatureFlag::RateLimitPerMinute).await.unwrap(), 60);
}

#[tokio::test]
async fn test_invalid_values_fall_back_to_defaults() {
    let provider = Arc::new(StaticFlagProvider::default());
    provider.set(FeatureFlag::PaginationLimit, 500).await;
    provider.set(FeatureFlag::RateLimitPerMinute, "lots").await;
    provider.set(FeatureFlag::StreamingEnabled, "maybe").await;
    let service = FeatureFlagService::new(provider);

    assert_eq!(service.get_usize(FeatureFlag::PaginationLimit).await.unwrap(), 20);
    assert_eq!(service.get_usize(FeatureFlag::RateLimitPerMinute).await.unwrap(), 60);
    assert!(service.is_enabled(FeatureFlag::StreamingEnabled).await.unwrap());
}

#[tokio::test]
async fn test_flag_kind_mismatch_is_rejected() {
    let service = FeatureFlagService::new(Arc::new(StaticFlagProvider::default()));

    let error = service
        .is_enabled(FeatureFlag::PaginationLimit)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert!(service.get_number(FeatureFlag::AiToolsEnabled).await.is_err());
    assert!(service.get_by_key("NOT_A_FLAG").await.is_err());
}

#[tokio::test]
async fn test_snapshot_lists_every_flag() {
    let provider = Arc::new(StaticFlagProvider::default());
    provider.set(FeatureFlag::AiToolsEnabled, true).await;
    let service = FeatureFlagService::new(provider);

    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), FeatureFlag::ALL.len());
    assert_eq!(snapshot.get("AI_TOOLS_ENABLED"), Some(&FlagValue::Boolean(true)));
    assert_eq!(snapshot.get("PAGINATION_LIMIT"), Some(&FlagValue::Number(20.0)));
}

async fn mixed_provider() -> Arc<StaticFlagProvider> {
    let provider = Arc::new(StaticFlagProvider::default());
    provider.set(FeatureFlag::AiToolsEnabled, true).await;
    provider.set(FeatureFlag::StreamingEnabled, "false").await;
    provider.set(FeatureFlag::PaginationLimit, 15).await;
    provider.set(FeatureFlag::ChatHistoryLimit, 2.5).await;
    provider.set(FeatureFlag::RateLimitPerMinute, "abc").await;
    provider.set_key("UNKNOWN_FLAG", RawFlagValue::Null).await;
    provider
}

#[tokio::test]
async fn test_snapshot_is_stable_across_calls() {
    let service = FeatureFlagService::new(mixed_provider().await);

    let first = service.snapshot().await.unwrap();
    let second = service.snapshot().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.get("PAGINATION_LIMIT"), Some(&FlagValue::Number(15.0)));
}

#[tokio::test]
async fn test_cached_snapshot_matches_uncached() {
    let inner = mixed_provider().await;
    let cache = Cache::in_memory().await.unwrap();
    let cached = Arc::new(CachedFlagProvider::new(
        inner.clone(),
        cache,
        "test",
        GetOrSetOptions::default(),
    ));

    // Miss computes from the inner provider, hit decodes the stored JSON
    let miss = cached.get_flags().await.unwrap();
    let hit = cached.get_flags().await.unwrap();
    assert_eq!(miss, hit);
    assert_eq!(hit, inner.get_flags().await.unwrap());

    let service = FeatureFlagService::new(cached);
    let first = service.snapshot().await.unwrap();
    let second = service.snapshot().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        FeatureFlagService::new(inner).snapshot().await.unwrap()
    );
}
