// ABOUTME: Feature flag provider trait and the concrete provider implementations
// ABOUTME: File, environment, static, composite and cache-aside providers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Cache-aside wrapper with stampede protection
pub mod cached;
/// Ordered merge of several providers
pub mod composite;
/// `FEATURE_FLAG_<KEY>` environment overrides
pub mod env;
/// Flag file loaded once per provider
pub mod file;
/// Mutable in-memory record
pub mod memory;

pub use cached::CachedFlagProvider;
pub use composite::CompositeFlagProvider;
pub use env::EnvFlagProvider;
pub use file::FileFlagProvider;
pub use memory::StaticFlagProvider;

use super::types::FeatureFlagRecord;
use crate::errors::AppResult;

/// Source of raw feature flag values
#[async_trait::async_trait]
pub trait FlagProvider: Send + Sync {
    /// Fetch the current raw record
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source is unavailable
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
