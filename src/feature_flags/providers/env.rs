// ABOUTME: Environment flag provider reading FEATURE_FLAG_<KEY> variables
// ABOUTME: Values go through the same scalar parser as the flag file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FlagProvider;
use crate::constants::feature_flags::ENV_OVERRIDE_PREFIX;
use crate::errors::AppResult;
use crate::feature_flags::parser::parse_scalar;
use crate::feature_flags::types::FeatureFlagRecord;
use std::env;

/// Per-flag overrides from the process environment
pub struct EnvFlagProvider {
    prefix: String,
}

impl Default for EnvFlagProvider {
    fn default() -> Self {
        Self::new(ENV_OVERRIDE_PREFIX)
    }
}

impl EnvFlagProvider {
    /// Read variables named `{prefix}{KEY}`
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl FlagProvider for EnvFlagProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        Ok(env::vars()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&self.prefix)?;
                (!key.is_empty()).then(|| (key.to_owned(), parse_scalar(&value)))
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "env"
    }
}
