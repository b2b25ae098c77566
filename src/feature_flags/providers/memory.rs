// ABOUTME: Static in-memory flag provider with a mutable record
// ABOUTME: Used by tests and embedders that set flags programmatically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FlagProvider;
use crate::errors::AppResult;
use crate::feature_flags::definitions::FeatureFlag;
use crate::feature_flags::types::{FeatureFlagRecord, RawFlagValue};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Flags held in memory; clones share the same record
#[derive(Clone, Default)]
pub struct StaticFlagProvider {
    record: Arc<RwLock<FeatureFlagRecord>>,
}

impl StaticFlagProvider {
    /// Provider starting with `record`
    #[must_use]
    pub fn new(record: FeatureFlagRecord) -> Self {
        Self {
            record: Arc::new(RwLock::new(record)),
        }
    }

    /// Set one flag
    pub async fn set(&self, flag: FeatureFlag, value: impl Into<RawFlagValue>) {
        self.set_key(flag.key(), value).await;
    }

    /// Set a raw key, recognized or not
    pub async fn set_key(&self, key: &str, value: impl Into<RawFlagValue>) {
        self.record
            .write()
            .await
            .insert(key.to_owned(), value.into());
    }

    /// Remove one flag so its default applies
    pub async fn unset(&self, flag: FeatureFlag) {
        self.record.write().await.remove(flag.key());
    }

    /// Replace the whole record
    pub async fn replace(&self, record: FeatureFlagRecord) {
        *self.record.write().await = record;
    }
}

#[async_trait::async_trait]
impl FlagProvider for StaticFlagProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        Ok(self.record.read().await.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
