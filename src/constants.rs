// ABOUTME: Re-exports application constants from chatrail-core
// ABOUTME: Grouped by domain (network, database, pagination, cache, redis, rate limiting)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use chatrail_core::constants::*;
