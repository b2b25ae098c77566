// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Liveness never touches dependencies; readiness pings the database and cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring

use axum::{extract::State, routing::get, Json, Router};

use crate::context::ServerContext;
use crate::errors::AppError;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(context: &ServerContext) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/ready", get(Self::ready))
            .with_state(context.clone())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn ready(
        State(context): State<ServerContext>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let data = context.data();
        data.database()
            .health_check()
            .await
            .map_err(|e| AppError::service_unavailable("database", e.message))?;
        data.cache()
            .health_check()
            .await
            .map_err(|e| AppError::service_unavailable("cache", e.message))?;

        Ok(Json(serde_json::json!({
            "status": "ready",
            "cache": data.cache().backend_name(),
            "flags": data.flags().provider_name(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })))
    }
}
