// ABOUTME: Application context built once at startup and shared by every request
// ABOUTME: Wires config, data collaborators, the chat service and the rate limiter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::DataContext;
use crate::cache::{Cache, CacheConfig};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::feature_flags::{build_provider, FeatureFlagService, FlagProvider};
use crate::llm::{MockTextGenerator, TextGenerator};
use crate::rate_limiting::RateLimiter;
use crate::services::ChatService;

/// Composed server context holding one instance of each collaborator
///
/// Constructed once and passed to the router as state; clones share the
/// underlying pool, cache and providers.
#[derive(Clone)]
pub struct ServerContext {
    config: Arc<ServerConfig>,
    data: DataContext,
    chat: ChatService,
    rate_limiter: RateLimiter,
}

impl ServerContext {
    /// Build every collaborator from configuration
    ///
    /// Connects (and migrates) the database, opens the cache backend and
    /// assembles the flag provider chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or cache cannot be initialized
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let database = Database::new(&config.database).await?;
        let cache = Cache::new(CacheConfig::from(&config.cache)).await?;
        let provider = build_provider(&config.feature_flags, &cache, &config.environment);
        let generator: Arc<dyn TextGenerator> = Arc::new(MockTextGenerator::new(
            Duration::from_millis(config.mock_llm_chunk_delay_ms),
        ));

        info!(
            cache = cache.backend_name(),
            flags = provider.name(),
            generator = generator.name(),
            "Server context initialized"
        );
        Ok(Self::new(config, database, cache, provider, generator))
    }

    /// Assemble a context from already constructed collaborators
    #[must_use]
    pub fn new(
        config: ServerConfig,
        database: Database,
        cache: Cache,
        provider: Arc<dyn FlagProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let flags = FeatureFlagService::new(provider);
        let chat = ChatService::new(database.clone(), flags.clone(), generator);
        let rate_limiter = RateLimiter::new(cache.clone(), flags.clone(), config.rate_limit_window());

        Self {
            config: Arc::new(config),
            data: DataContext::new(database, cache, flags),
            chat,
            rate_limiter,
        }
    }

    /// Get server configuration
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get data context
    #[must_use]
    pub const fn data(&self) -> &DataContext {
        &self.data
    }

    /// Get the chat service
    #[must_use]
    pub const fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Get the request rate limiter
    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
