// ABOUTME: Route module organization for the chatrail HTTP API
// ABOUTME: Assembles domain routers and the cross-cutting tracing, request id and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for chatrail
//!
//! Each domain module contains only route definitions and thin handlers that
//! delegate to the service layer.

/// Chat listing, history and completion routes
pub mod chat;
/// Health check and readiness routes
pub mod health;

pub use chat::{ChatRoutes, CompletionRequest, PaginationQuery};
pub use health::HealthRoutes;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::context::ServerContext;
use crate::middleware::{create_request_span, request_id_header, setup_cors, MakeRequestUuid};

/// Build the complete application router
///
/// Request ids are assigned before the trace span opens so every log line of
/// a request carries the same id, and the id is echoed in the response.
pub fn router(context: &ServerContext) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(context))
        .merge(ChatRoutes::routes(context))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(create_request_span))
                .layer(PropagateRequestIdLayer::new(request_id_header()))
                .layer(setup_cors(context.config())),
        )
}
