// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Builds the typed ServerConfig from environment variables at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based server configuration

use super::{env_flag, env_or, CacheSettings, FeatureFlagConfig};
use crate::constants::{database, network, rate_limiting};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx `SQLite` connection URL
    pub url: String,
    /// Maximum pool connections
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: database::DEFAULT_DATABASE_URL.to_owned(),
            pool_size: database::DEFAULT_POOL_SIZE,
        }
    }
}

impl DatabaseSettings {
    /// Whether the URL points at a private in-memory database
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment name (development, test, production)
    pub environment: String,
    /// Bind host
    pub host: String,
    /// Bind port
    pub http_port: u16,
    /// Database settings
    pub database: DatabaseSettings,
    /// Cache backend settings
    pub cache: CacheSettings,
    /// Feature flag source settings
    pub feature_flags: FeatureFlagConfig,
    /// Fixed rate limit window length in seconds
    pub rate_limit_window_secs: u64,
    /// Reject requests without the `X-Firebase-AppCheck` header
    pub require_app_check: bool,
    /// Delay between streamed fragments of the mock generator in milliseconds
    pub mock_llm_chunk_delay_ms: u64,
    /// Comma-separated CORS origins, `*` for any
    pub cors_allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_owned(),
            host: network::DEFAULT_HOST.to_owned(),
            http_port: network::DEFAULT_HTTP_PORT,
            database: DatabaseSettings::default(),
            cache: CacheSettings::default(),
            feature_flags: FeatureFlagConfig::default(),
            rate_limit_window_secs: rate_limiting::DEFAULT_WINDOW_SECS,
            require_app_check: true,
            mock_llm_chunk_delay_ms: 0,
            cors_allowed_origins: "*".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT`/`HTTP_PORT` is set but is not a valid port,
    /// or if the rate limit window is zero
    pub fn from_env() -> AppResult<Self> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_owned());

        let http_port = match env::var("PORT").or_else(|_| env::var("HTTP_PORT")) {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("Invalid PORT value '{raw}': {e}")))?,
            Err(_) => network::DEFAULT_HTTP_PORT,
        };

        let rate_limit_window_secs =
            env_or("RATE_LIMIT_WINDOW_SECS", rate_limiting::DEFAULT_WINDOW_SECS);
        if rate_limit_window_secs == 0 {
            return Err(AppError::config("RATE_LIMIT_WINDOW_SECS must be positive"));
        }

        Ok(Self {
            environment,
            host: env::var("HOST").unwrap_or_else(|_| network::DEFAULT_HOST.to_owned()),
            http_port,
            database: DatabaseSettings {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| database::DEFAULT_DATABASE_URL.to_owned()),
                pool_size: env_or("DB_POOL_SIZE", database::DEFAULT_POOL_SIZE),
            },
            cache: CacheSettings::from_env(),
            feature_flags: FeatureFlagConfig::from_env(),
            rate_limit_window_secs,
            require_app_check: env_flag("REQUIRE_APP_CHECK", true),
            mock_llm_chunk_delay_ms: env_or("MOCK_LLM_CHUNK_DELAY_MS", 0),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_owned()),
        })
    }

    /// Rate limit window as a duration
    #[must_use]
    pub const fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Bind address in `host:port` form
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    /// Human-readable summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Chatrail Server Configuration:\n\
             - Environment: {}\n\
             - HTTP Address: {}\n\
             - Database: {}\n\
             - Cache: {}\n\
             - Feature Flags: {} (cache {}, ttl {}s)\n\
             - Rate Limit Window: {}s\n\
             - App Check: {}",
            self.environment,
            self.bind_address(),
            if self.database.is_memory() {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            if self.cache.redis_url.is_some() {
                "Redis"
            } else {
                "In-memory"
            },
            self.feature_flags.path.display(),
            if self.feature_flags.cache_enabled {
                "enabled"
            } else {
                "disabled"
            },
            self.feature_flags.cache_ttl_secs,
            self.rate_limit_window_secs,
            if self.require_app_check {
                "Required"
            } else {
                "Optional"
            },
        )
    }
}
