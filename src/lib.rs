// ABOUTME: Main library entry point for the chatrail chat API server
// ABOUTME: Exposes chat, pagination, feature flag, cache and rate limiting modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy.
#![deny(unsafe_code)]

//! # Chatrail Server
//!
//! A chat backend whose behavior is driven by feature flags. Users list their
//! chats, page through message history and request completions that are
//! answered either as a JSON body or as a Server-Sent Events stream.
//!
//! ## Features
//!
//! - **Feature flags**: YAML file, environment and in-memory providers, layered
//!   and cached with stampede protection
//! - **Cursor pagination**: stable keyset pages over chats and messages
//! - **Streaming completions**: ordered SSE events from a deterministic mock model
//! - **Rate limiting**: fixed-window per-user counters on the shared cache
//!
//! ## Architecture
//!
//! - **Routes**: thin axum handlers that delegate to services
//! - **Services**: chat workflows that pick strategies from flags
//! - **Database**: `SQLite` storage for users, chats, messages and token usage
//! - **Cache**: in-memory LRU or Redis behind one trait
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chatrail_server::config::environment::ServerConfig;
//! use chatrail_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Chatrail configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Bearer mock-token authentication
pub mod auth;

/// Cache abstraction layer with pluggable backends
pub mod cache;

/// Chat strategies, completion events and response types
pub mod chats;

/// Environment-driven configuration
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Focused dependency injection contexts
pub mod context;

/// `SQLite` storage for users, chats, messages and token usage
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Feature flag definitions, providers and typed evaluation
pub mod feature_flags;

/// Text generation abstraction and the deterministic mock model
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// HTTP middleware for auth, rate limiting, tracing and CORS
pub mod middleware;

/// Cursor-based pagination over database queries
pub mod pagination;

/// Fixed-window rate limiting on the shared cache
pub mod rate_limiting;

/// `HTTP` routes for chats and health checks
pub mod routes;

/// Domain service layer for chat workflows
pub mod services;
