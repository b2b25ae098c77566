// ABOUTME: Data context bundling the database, shared cache and feature flag service
// ABOUTME: Every long-lived data collaborator is constructed once and cloned cheaply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::cache::Cache;
use crate::database::Database;
use crate::feature_flags::FeatureFlagService;

/// Data context containing persistence and flag dependencies
///
/// # Dependencies
/// - `database`: users, chats, messages and token usage
/// - `cache`: flag record cache and rate limit counters
/// - `flags`: validated feature flag access
#[derive(Clone)]
pub struct DataContext {
    database: Database,
    cache: Cache,
    flags: FeatureFlagService,
}

impl DataContext {
    /// Create new data context
    #[must_use]
    pub const fn new(database: Database, cache: Cache, flags: FeatureFlagService) -> Self {
        Self {
            database,
            cache,
            flags,
        }
    }

    /// Get database for persistence operations
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Get the shared cache
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Get the feature flag service
    #[must_use]
    pub const fn flags(&self) -> &FeatureFlagService {
        &self.flags
    }
}
