// ABOUTME: Cache-aside flag provider storing the merged record in the shared cache
// ABOUTME: A TTL-bounded lock lets one caller recompute while others wait for the fill
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FlagProvider;
use crate::cache::{Cache, CacheKey, GetOrSetOptions};
use crate::config::FeatureFlagConfig;
use crate::errors::AppResult;
use crate::feature_flags::types::FeatureFlagRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Wraps another provider with the shared cache under `feature_flags:{env}`
pub struct CachedFlagProvider {
    inner: Arc<dyn FlagProvider>,
    cache: Cache,
    key: CacheKey,
    options: GetOrSetOptions,
}

impl CachedFlagProvider {
    /// Cache `inner` for `environment` with explicit timings
    #[must_use]
    pub fn new(
        inner: Arc<dyn FlagProvider>,
        cache: Cache,
        environment: &str,
        options: GetOrSetOptions,
    ) -> Self {
        Self {
            inner,
            cache,
            key: CacheKey::feature_flags(environment),
            options,
        }
    }

    /// Cache `inner` with timings from configuration
    #[must_use]
    pub fn from_config(
        inner: Arc<dyn FlagProvider>,
        cache: Cache,
        environment: &str,
        config: &FeatureFlagConfig,
    ) -> Self {
        let options = GetOrSetOptions {
            ttl: config.cache_ttl(),
            lock_ttl: Duration::from_millis(config.lock_ttl_ms),
            wait: Duration::from_millis(config.wait_ms),
            wait_interval: Duration::from_millis(config.wait_interval_ms),
        };
        Self::new(inner, cache, environment, options)
    }

    /// Cache key holding the record
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }
}

#[async_trait::async_trait]
impl FlagProvider for CachedFlagProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        let inner = &self.inner;
        let key = &self.key;
        self.cache
            .get_or_set_json(
                key,
                || async move {
                    debug!(cache_key = %key, provider = inner.name(), "Feature flag cache miss, refreshing from provider");
                    inner.get_flags().await
                },
                self.options,
            )
            .await
    }

    fn name(&self) -> &'static str {
        "cached"
    }
}
