// ABOUTME: Core types and constants for the chatrail chat backend
// ABOUTME: Foundation crate with error handling, cursor pagination, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Chatrail Core
//!
//! Foundation crate providing shared types and constants for the chatrail
//! server. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Application-wide constants organized by domain
//! - **pagination**: Cursor page shape, limit normalization and page numbering

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants and configuration values organized by domain
pub mod constants;

/// Cursor-based pagination types shared by chats and messages
pub mod pagination;
