// ABOUTME: Feature flag subsystem: definitions, parser, providers and the evaluation service
// ABOUTME: Flags are read per request so behavior changes without a redeploy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Feature Flags
//!
//! Raw values come from a [`FlagProvider`] chain (file, environment overrides,
//! shared cache). [`FeatureFlagService`] validates them against the compiled-in
//! [`FlagDefinition`]s and falls back to defaults for anything unusable.

/// Compiled-in flag definitions
pub mod definitions;
/// `key: value` flag file parser
pub mod parser;
/// Flag providers
pub mod providers;
/// Evaluation service
pub mod service;
/// Raw and resolved value types
pub mod types;

pub use definitions::{FeatureFlag, FlagDefinition};
pub use providers::{
    CachedFlagProvider, CompositeFlagProvider, EnvFlagProvider, FileFlagProvider, FlagProvider,
    StaticFlagProvider,
};
pub use service::FeatureFlagService;
pub use types::{FeatureFlagRecord, FlagValue, RawFlagValue};

use crate::cache::Cache;
use crate::config::FeatureFlagConfig;
use std::sync::Arc;
use tracing::info;

/// Assemble the provider chain described by `config`
///
/// File first, environment overrides layered on top, the merged record cached
/// under `feature_flags:{environment}` when caching is enabled.
#[must_use]
pub fn build_provider(
    config: &FeatureFlagConfig,
    cache: &Cache,
    environment: &str,
) -> Arc<dyn FlagProvider> {
    let file: Arc<dyn FlagProvider> = Arc::new(FileFlagProvider::new(config.path.clone()));

    let merged: Arc<dyn FlagProvider> = if config.env_overrides {
        Arc::new(CompositeFlagProvider::new(vec![
            file,
            Arc::new(EnvFlagProvider::default()),
        ]))
    } else {
        file
    };

    info!(
        path = %config.path.display(),
        env_overrides = config.env_overrides,
        cached = config.cache_enabled,
        cache_backend = cache.backend_name(),
        "Feature flag providers configured"
    );

    if config.cache_enabled {
        Arc::new(CachedFlagProvider::from_config(
            merged,
            cache.clone(),
            environment,
            config,
        ))
    } else {
        merged
    }
}
