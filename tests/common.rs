// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory database, seeding and server context helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `chatrail_server`

use std::sync::{Arc, Once};

use anyhow::Result;
use chatrail_server::{
    cache::Cache,
    config::ServerConfig,
    context::ServerContext,
    database::{ChatRecord, Database, MessageRole, UserRecord},
    feature_flags::{FeatureFlag, FlagProvider, RawFlagValue, StaticFlagProvider},
    llm::{MockTextGenerator, TextGenerator},
    routes,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::in_memory().await?)
}

/// Fixed base time so seeded rows have a known order
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Create a user with a predictable email
pub async fn create_test_user(database: &Database, id: &str) -> Result<UserRecord> {
    Ok(database
        .create_user_with_id(id, &format!("{id}@example.com"), Some("Test User"))
        .await?)
}

/// Create `count` chats one minute apart; the last one is the newest
pub async fn seed_chats(database: &Database, user_id: &str, count: usize) -> Result<Vec<ChatRecord>> {
    let mut chats = Vec::with_capacity(count);
    for index in 0..count {
        let at = base_time() + Duration::minutes(index as i64);
        chats.push(
            database
                .create_chat_at(user_id, &format!("Chat {index}"), at)
                .await?,
        );
    }
    Ok(chats)
}

/// Append `count` alternating user/assistant messages one second apart
pub async fn seed_messages(database: &Database, chat_id: &str, count: usize) -> Result<()> {
    for index in 0..count {
        let role = if index % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        let at = base_time() + Duration::seconds(index as i64);
        database
            .create_message_at(chat_id, role, &format!("Message {index}"), at)
            .await?;
    }
    Ok(())
}

/// Fully wired server with in-memory collaborators and mutable flags
pub struct TestServer {
    pub context: ServerContext,
    pub flags: Arc<StaticFlagProvider>,
}

impl TestServer {
    /// Build a server on a fresh in-memory database and cache
    pub async fn new() -> Result<Self> {
        Self::with_config(ServerConfig::default()).await
    }

    /// Build a server with a custom configuration
    pub async fn with_config(config: ServerConfig) -> Result<Self> {
        init_test_logging();
        let database = Database::in_memory().await?;
        let cache = Cache::in_memory().await?;
        let flags = Arc::new(StaticFlagProvider::default());
        let provider: Arc<dyn FlagProvider> = flags.clone();
        let generator: Arc<dyn TextGenerator> = Arc::new(MockTextGenerator::default());

        let context = ServerContext::new(config, database, cache, provider, generator);
        Ok(Self { context, flags })
    }

    /// Set a flag for subsequent requests
    pub async fn set_flag(&self, flag: FeatureFlag, value: impl Into<RawFlagValue>) {
        self.flags.set(flag, value).await;
    }

    pub fn database(&self) -> &Database {
        self.context.data().database()
    }

    /// Complete application router
    pub fn router(&self) -> axum::Router {
        routes::router(&self.context)
    }
}
