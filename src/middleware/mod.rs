// ABOUTME: HTTP middleware for request tracing, authentication, rate limiting and CORS
// ABOUTME: Authentication runs before rate limiting so counters are keyed by user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod auth;
pub mod cors;
pub mod rate_limiting;
pub mod tracing;

// Authentication middleware
pub use auth::{require_auth, APP_CHECK_HEADER};

// CORS configuration
pub use cors::setup_cors;

// Rate limiting middleware and utilities
pub use rate_limiting::{create_rate_limit_headers, headers, rate_limit};

// Request tracing and correlation
pub use self::tracing::{create_request_span, request_id_header, MakeRequestUuid, REQUEST_ID_HEADER};
