// ABOUTME: Chat route handlers: list chats, message history and completions
// ABOUTME: Completions answer with SSE or a JSON body depending on STREAMING_ENABLED
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes
//!
//! Every handler requires an authenticated caller and counts against the
//! caller's rate limit. Handlers only translate HTTP to [`ChatService`] calls.
//!
//! [`ChatService`]: crate::services::ChatService

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::chats::{ChatSummary, CompletionEvent, HistoryMessage};
use crate::context::ServerContext;
use crate::errors::AppError;
use crate::middleware::{rate_limit, require_auth};
use crate::pagination::{CursorPage, PageLimit, PaginationParams};

// ============================================================================
// Request Types
// ============================================================================

/// Query string of the paginated endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    /// Row id to continue after
    #[serde(default)]
    pub cursor: Option<String>,
    /// Requested page size as sent
    #[serde(default)]
    pub limit: Option<String>,
}

impl From<PaginationQuery> for PaginationParams {
    fn from(query: PaginationQuery) -> Self {
        Self {
            cursor: query.cursor,
            limit: query.limit.map(PageLimit::Text),
        }
    }
}

/// Body of a completion request
#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    /// Text to reply to
    pub prompt: String,
}

impl CompletionRequest {
    /// Parse a request body, reporting malformed input as a validation error
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` if the body is not a JSON object with a string `prompt`
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::invalid_input(format!("Invalid completion request: {e}")))
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Chat routes implementation
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes behind authentication and rate limiting
    pub fn routes(context: &ServerContext) -> Router {
        Router::new()
            .route("/api/chats", get(Self::list_chats))
            .route("/api/chats/:chat_id/history", get(Self::chat_history))
            .route("/api/chats/:chat_id/completion", post(Self::completion))
            // Layers run bottom-up: authenticate, then count the request
            .layer(middleware::from_fn_with_state(context.clone(), rate_limit))
            .layer(middleware::from_fn_with_state(context.clone(), require_auth))
            .with_state(context.clone())
    }

    async fn list_chats(
        State(context): State<ServerContext>,
        user: AuthenticatedUser,
        Query(query): Query<PaginationQuery>,
    ) -> Result<Json<CursorPage<ChatSummary>>, AppError> {
        let page = context
            .chat()
            .list_user_chats(&user, &query.into())
            .await?;
        Ok(Json(page))
    }

    async fn chat_history(
        State(context): State<ServerContext>,
        user: AuthenticatedUser,
        Path(chat_id): Path<String>,
        Query(query): Query<PaginationQuery>,
    ) -> Result<Json<CursorPage<HistoryMessage>>, AppError> {
        let page = context
            .chat()
            .get_chat_history(&user, &chat_id, &query.into())
            .await?;
        Ok(Json(page))
    }

    async fn completion(
        State(context): State<ServerContext>,
        user: AuthenticatedUser,
        Path(chat_id): Path<String>,
        body: Bytes,
    ) -> Result<Response, AppError> {
        let request = CompletionRequest::from_body(&body)?;
        let chat = context.chat();

        if chat.completion_response().await?.is_streaming() {
            info!(chat_id = %chat_id, "Streaming completion");
            let events = chat
                .stream_user_chat_completion(&user, &chat_id, &request.prompt)
                .await?;
            return Ok(Self::sse_response(events));
        }

        let result = chat
            .get_user_chat_completion(&user, &chat_id, &request.prompt)
            .await?;
        Ok(Json(result).into_response())
    }

    fn sse_response(events: mpsc::Receiver<CompletionEvent>) -> Response {
        let mut response = Sse::new(Self::event_stream(events))
            .keep_alive(KeepAlive::default())
            .into_response();

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
        response
    }

    fn event_stream(
        events: mpsc::Receiver<CompletionEvent>,
    ) -> impl Stream<Item = Result<Event, Infallible>> {
        ReceiverStream::new(events).map(|event| Ok(event.to_sse_event()))
    }
}
