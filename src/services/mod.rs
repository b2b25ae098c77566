// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Services take an authenticated identity and return transport-neutral results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Domain service layer
//!
//! Route handlers only extract input and shape responses; every business rule
//! (ownership, flag-driven strategy choice, persistence order) lives here.

/// Chat listing, history and completions
pub mod chat;

pub use chat::ChatService;
