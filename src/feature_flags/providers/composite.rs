// ABOUTME: Composite flag provider merging child records in order
// ABOUTME: Later providers override keys from earlier ones; any child failure fails the merge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FlagProvider;
use crate::errors::AppResult;
use crate::feature_flags::types::FeatureFlagRecord;
use std::sync::Arc;

/// Ordered merge of several providers
pub struct CompositeFlagProvider {
    providers: Vec<Arc<dyn FlagProvider>>,
}

impl CompositeFlagProvider {
    /// Merge `providers`, lowest precedence first
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn FlagProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait::async_trait]
impl FlagProvider for CompositeFlagProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        let mut merged = FeatureFlagRecord::new();
        for provider in &self.providers {
            merged.extend(provider.get_flags().await?);
        }
        Ok(merged)
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}
