// ABOUTME: File-backed flag provider reading `key: value` lines once per provider lifetime
// ABOUTME: Concurrent first calls share a single load; failed loads are not cached
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FlagProvider;
use crate::errors::{AppError, AppResult};
use crate::feature_flags::parser::parse_flags;
use crate::feature_flags::types::FeatureFlagRecord;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Flags parsed from a file on first use
pub struct FileFlagProvider {
    path: PathBuf,
    record: OnceCell<FeatureFlagRecord>,
}

impl FileFlagProvider {
    /// Provider for the flag file at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: OnceCell::new(),
        }
    }

    /// Path this provider reads
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> AppResult<FeatureFlagRecord> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Failed to load feature flags file");
            AppError::config(format!(
                "Failed to read feature flags file {}: {e}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        let record = parse_flags(&contents);
        info!(path = %self.path.display(), flags = record.len(), "Loaded feature flags file");
        Ok(record)
    }
}

#[async_trait::async_trait]
impl FlagProvider for FileFlagProvider {
    async fn get_flags(&self) -> AppResult<FeatureFlagRecord> {
        self.record
            .get_or_try_init(|| self.load())
            .await
            .cloned()
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
