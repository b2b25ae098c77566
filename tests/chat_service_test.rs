// ABOUTME: Integration tests for the chat service workflows over a real in-memory database
// ABOUTME: Covers flag-driven strategies, stored replies, model context and streamed event order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatrail_server::auth::AuthenticatedUser;
use chatrail_server::cache::Cache;
use chatrail_server::chats::{CompletionEvent, ToolPhase, MOCK_SEARCH_TOOL};
use chatrail_server::config::ServerConfig;
use chatrail_server::context::ServerContext;
use chatrail_server::database::{Database, MessageRole};
use chatrail_server::errors::{AppError, ErrorCode};
use chatrail_server::feature_flags::{FeatureFlag, FlagProvider, StaticFlagProvider};
use chatrail_server::llm::{
    Generation, GenerationRequest, MockTextGenerator, StreamingGeneration, TextGenerator,
    TokenUsage,
};
use chatrail_server::pagination::PaginationParams;
use common::{create_test_user, seed_chats, seed_messages, TestServer};
use tokio::sync::mpsc;

fn identity(id: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        id: id.to_owned(),
        email: format!("{id}@example.com"),
        name: "Test User".to_owned(),
    }
}

async fn collect(mut events: mpsc::Receiver<CompletionEvent>) -> Vec<CompletionEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

/// Generator that records every request before delegating to the mock
#[derive(Default)]
struct RecordingGenerator {
    inner: MockTextGenerator,
    requests: Mutex<Vec<GenerationRequest>>,
}

#[async_trait::async_trait]
impl TextGenerator for RecordingGenerator {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.generate(request).await
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingGeneration, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.generate_stream(request).await
    }
}

/// Generator whose stream fails after the first fragment
struct FailingGenerator;

#[async_trait::async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-model"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, AppError> {
        Err(AppError::internal("model backend exploded"))
    }

    async fn generate_stream(
        &self,
        _request: &GenerationRequest,
    ) -> Result<StreamingGeneration, AppError> {
        let fragments = async_stream::stream! {
            yield Ok("Hello".to_owned());
            yield Err(AppError::internal("model backend exploded"));
        };
        Ok(StreamingGeneration {
            model: "failing-model".to_owned(),
            usage: TokenUsage::new(1, 1),
            fragments: Box::pin(fragments),
        })
    }
}

async fn context_with(
    generator: Arc<dyn TextGenerator>,
) -> (ServerContext, Arc<StaticFlagProvider>) {
    common::init_test_logging();
    let database = Database::in_memory().await.unwrap();
    let cache = Cache::in_memory().await.unwrap();
    let flags = Arc::new(StaticFlagProvider::default());
    let provider: Arc<dyn FlagProvider> = flags.clone();
    let context = ServerContext::new(ServerConfig::default(), database, cache, provider, generator);
    (context, flags)
}

// ============================================================================
// Listing and history
// ============================================================================

#[tokio::test]
async fn test_list_chats_honors_pagination_limit_flag() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::PaginationLimit, 10).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    seed_chats(server.database(), "user-1", 16).await.unwrap();

    let page = server
        .context
        .chat()
        .list_user_chats(&identity("user-1"), &PaginationParams::first())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 10);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total, 16);
    assert!(page.has_more);
    assert_eq!(page.data[0].title, "Chat 15");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = TestServer::new().await.unwrap();

    let error = server
        .context
        .chat()
        .list_user_chats(&identity("ghost"), &PaginationParams::first())
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_history_of_foreign_chat_is_not_found() {
    let server = TestServer::new().await.unwrap();
    create_test_user(server.database(), "owner").await.unwrap();
    create_test_user(server.database(), "intruder").await.unwrap();
    let chats = seed_chats(server.database(), "owner", 1).await.unwrap();

    let error = server
        .context
        .chat()
        .get_chat_history(&identity("intruder"), &chats[0].id, &PaginationParams::first())
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_history_disabled_returns_recent_window() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::ChatHistoryEnabled, false).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();
    seed_messages(server.database(), &chats[0].id, 15).await.unwrap();

    let page = server
        .context
        .chat()
        .get_chat_history(&identity("user-1"), &chats[0].id, &PaginationParams::first())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 10);
    assert!(!page.has_more);
    assert!(page.cursor.next.is_none());
    assert_eq!(page.data[0].content, "Message 5");
    assert_eq!(page.data[9].content, "Message 14");
}

#[tokio::test]
async fn test_history_enabled_paginates() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::ChatHistoryEnabled, true).await;
    server.set_flag(FeatureFlag::PaginationLimit, 10).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();
    seed_messages(server.database(), &chats[0].id, 15).await.unwrap();

    let page = server
        .context
        .chat()
        .get_chat_history(&identity("user-1"), &chats[0].id, &PaginationParams::first())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 10);
    assert_eq!(page.total, 15);
    assert!(page.has_more);
    assert!(page.cursor.next.is_some());
}

// ============================================================================
// Buffered completions
// ============================================================================

#[tokio::test]
async fn test_completion_with_tools_enabled() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::AiToolsEnabled, true).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();

    let result = server
        .context
        .chat()
        .get_user_chat_completion(&identity("user-1"), &chats[0].id, "How am I doing?")
        .await
        .unwrap();

    assert_eq!(result.chat_id, chats[0].id);
    assert!(result.tools_used);
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].name, MOCK_SEARCH_TOOL);
    assert!(!result.content.is_empty());
    assert_eq!(result.usage.model, "mock-model");
    assert_eq!(
        result.usage.total_tokens,
        result.usage.input_tokens + result.usage.output_tokens
    );
}

#[tokio::test]
async fn test_completion_stores_prompt_reply_and_usage() {
    let server = TestServer::new().await.unwrap();
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();

    let result = server
        .context
        .chat()
        .get_user_chat_completion(&identity("user-1"), &chats[0].id, "Hello")
        .await
        .unwrap();
    assert!(!result.tools_used);
    assert!(result.tool_calls.is_empty());

    let stored = server
        .database()
        .recent_messages(&chats[0].id, 10)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, MessageRole::User);
    assert_eq!(stored[0].content, "Hello");
    assert_eq!(stored[1].role, MessageRole::Assistant);
    assert_eq!(stored[1].content, result.content);

    let usage = server
        .database()
        .token_usage_by_chat(&chats[0].id)
        .await
        .unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].user_id, "user-1");
    assert_eq!(usage[0].message_id.as_deref(), Some(stored[1].id.as_str()));
    assert_eq!(usage[0].total_tokens, i64::from(result.usage.total_tokens));
}

#[tokio::test]
async fn test_context_excludes_prompt_and_respects_limit() {
    let generator = Arc::new(RecordingGenerator::default());
    let (context, flags) = context_with(generator.clone()).await;
    flags.set(FeatureFlag::ChatHistoryEnabled, true).await;
    flags.set(FeatureFlag::ChatHistoryLimit, 3).await;
    let database = context.data().database();
    create_test_user(database, "user-1").await.unwrap();
    let chats = seed_chats(database, "user-1", 1).await.unwrap();
    seed_messages(database, &chats[0].id, 6).await.unwrap();

    context
        .chat()
        .get_user_chat_completion(&identity("user-1"), &chats[0].id, "Next question")
        .await
        .unwrap();

    let requests = generator.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Next question");
    let contents: Vec<_> = requests[0]
        .messages
        .iter()
        .map(|message| message.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Message 3", "Message 4", "Message 5"]);
}

#[tokio::test]
async fn test_history_disabled_sends_no_context() {
    let generator = Arc::new(RecordingGenerator::default());
    let (context, flags) = context_with(generator.clone()).await;
    flags.set(FeatureFlag::ChatHistoryEnabled, false).await;
    let database = context.data().database();
    create_test_user(database, "user-1").await.unwrap();
    let chats = seed_chats(database, "user-1", 1).await.unwrap();
    seed_messages(database, &chats[0].id, 4).await.unwrap();

    context
        .chat()
        .get_user_chat_completion(&identity("user-1"), &chats[0].id, "Hi")
        .await
        .unwrap();

    assert!(generator.requests.lock().unwrap()[0].messages.is_empty());
}

// ============================================================================
// Streamed completions
// ============================================================================

#[tokio::test]
async fn test_stream_event_order_with_tools() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::AiToolsEnabled, true).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();

    let events = server
        .context
        .chat()
        .stream_user_chat_completion(&identity("user-1"), &chats[0].id, "How am I doing?")
        .await
        .unwrap();
    let events = collect(events).await;

    let names: Vec<_> = events.iter().map(CompletionEvent::name).collect();
    assert_eq!(names[0], "thinking");
    assert_eq!(names[1], "tool_execution");
    assert_eq!(names[2], "tool_execution");
    assert_eq!(names[3], "tool");
    assert_eq!(names.last(), Some(&"done"));
    assert!(names[4..names.len() - 1].iter().all(|name| *name == "message"));
    assert!(names.len() > 5);

    assert!(matches!(
        &events[1],
        CompletionEvent::ToolExecution { phase: ToolPhase::Start, .. }
    ));
    assert!(matches!(
        &events[2],
        CompletionEvent::ToolExecution { phase: ToolPhase::Complete, .. }
    ));

    let streamed: String = events
        .iter()
        .filter_map(|event| match event {
            CompletionEvent::Message { chunk } => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    let stored = server
        .database()
        .recent_messages(&chats[0].id, 1)
        .await
        .unwrap();
    assert_eq!(stored[0].role, MessageRole::Assistant);
    assert_eq!(stored[0].content, streamed);

    let CompletionEvent::Done { chat_id, usage } = events.last().unwrap() else {
        panic!("last event is not done");
    };
    assert_eq!(chat_id, &chats[0].id);
    assert_eq!(usage.input_tokens, 4);
}

#[tokio::test]
async fn test_stream_without_tools_skips_tool_events() {
    let server = TestServer::new().await.unwrap();
    server.set_flag(FeatureFlag::AiToolsEnabled, false).await;
    create_test_user(server.database(), "user-1").await.unwrap();
    let chats = seed_chats(server.database(), "user-1", 1).await.unwrap();

    let events = server
        .context
        .chat()
        .stream_user_chat_completion(&identity("user-1"), &chats[0].id, "Hi")
        .await
        .unwrap();
    let names: Vec<_> = collect(events)
        .await
        .iter()
        .map(CompletionEvent::name)
        .collect();

    assert_eq!(names[0], "thinking");
    assert_eq!(names[1], "message");
    assert_eq!(names.last(), Some(&"done"));
    assert!(!names.contains(&"tool"));
    assert!(!names.contains(&"tool_execution"));
}

#[tokio::test]
async fn test_stream_for_foreign_chat_fails_before_streaming() {
    let server = TestServer::new().await.unwrap();
    create_test_user(server.database(), "owner").await.unwrap();
    create_test_user(server.database(), "intruder").await.unwrap();
    let chats = seed_chats(server.database(), "owner", 1).await.unwrap();

    let error = server
        .context
        .chat()
        .stream_user_chat_completion(&identity("intruder"), &chats[0].id, "Hi")
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_stream_failure_ends_with_sanitized_error_event() {
    let (context, _flags) = context_with(Arc::new(FailingGenerator)).await;
    let database = context.data().database();
    create_test_user(database, "user-1").await.unwrap();
    let chats = seed_chats(database, "user-1", 1).await.unwrap();

    let events = context
        .chat()
        .stream_user_chat_completion(&identity("user-1"), &chats[0].id, "Hi")
        .await
        .unwrap();
    let events = collect(events).await;

    let names: Vec<_> = events.iter().map(CompletionEvent::name).collect();
    assert_eq!(names, vec!["thinking", "message", "error"]);
    let CompletionEvent::Error { message } = events.last().unwrap() else {
        panic!("last event is not an error");
    };
    assert!(!message.contains("exploded"));

    // Only the prompt was stored
    let stored = database.recent_messages(&chats[0].id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_stream_reply_is_stored_after_client_disconnects() {
    let generator = Arc::new(MockTextGenerator::new(Duration::from_millis(5)));
    let (context, _flags) = context_with(generator).await;
    let database = context.data().database();
    create_test_user(database, "user-1").await.unwrap();
    let chats = seed_chats(database, "user-1", 1).await.unwrap();

    let mut events = context
        .chat()
        .stream_user_chat_completion(&identity("user-1"), &chats[0].id, "Hi there")
        .await
        .unwrap();
    let first = events.recv().await.unwrap();
    assert_eq!(first.name(), "thinking");
    drop(events);

    let mut usage = Vec::new();
    for _ in 0..200 {
        usage = database.token_usage_by_chat(&chats[0].id).await.unwrap();
        if !usage.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(usage.len(), 1);

    let stored = database.recent_messages(&chats[0].id, 10).await.unwrap();
    let roles: Vec<_> = stored.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    assert_eq!(stored[1].content, MockTextGenerator::reply_for("Hi there"));
    assert_eq!(usage[0].message_id.as_deref(), Some(stored[1].id.as_str()));
}
