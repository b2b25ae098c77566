// ABOUTME: Dependency contexts constructed once at startup and passed to handlers as state
// ABOUTME: Replaces global singletons with explicit constructor injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Application contexts
//!
//! - `DataContext`: database, cache and feature flag dependencies
//! - `ServerContext`: configuration plus the services built on `DataContext`

pub mod data;
pub mod server;

pub use data::DataContext;
pub use server::ServerContext;
