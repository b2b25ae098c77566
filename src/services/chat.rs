// ABOUTME: Chat use cases: list chats, fetch history, buffered and streamed completions
// ABOUTME: Resolves ownership, consults feature flags and persists messages and token usage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Service
//!
//! A completion runs strictly in order: persist the prompt, gather earlier
//! messages as context (when `CHAT_HISTORY_ENABLED`), run the tool strategy,
//! generate, then persist the reply and its token usage. The streamed variant
//! runs the same steps on a spawned task and reports progress through a
//! [`CompletionEmitter`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::auth::AuthenticatedUser;
use crate::chats::{
    ChatCompletionResponseSelector, ChatCompletionResult, ChatHistoryStrategySelector,
    ChatSummary, CompletionEmitter, CompletionEvent, CompletionResponseStrategy,
    CompletionUsage, HistoryMessage, ToolExecutionContext, ToolExecutionResult,
    ToolStrategySelector,
};
use crate::database::{ChatRecord, Database, MessageRole, NewTokenUsage, UserRecord};
use crate::errors::{AppError, AppResult};
use crate::feature_flags::{FeatureFlag, FeatureFlagService};
use crate::llm::{ContextMessage, GenerationRequest, TextGenerator, TokenUsage};
use crate::pagination::{paginate, CursorPage, PaginationParams};

/// Chat use cases over one database, flag service and generator
#[derive(Clone)]
pub struct ChatService {
    database: Database,
    flags: FeatureFlagService,
    history: ChatHistoryStrategySelector,
    tools: ToolStrategySelector,
    responses: ChatCompletionResponseSelector,
    generator: Arc<dyn TextGenerator>,
}

impl ChatService {
    /// Create the service; selectors share `flags`
    #[must_use]
    pub fn new(
        database: Database,
        flags: FeatureFlagService,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            history: ChatHistoryStrategySelector::new(flags.clone()),
            tools: ToolStrategySelector::new(flags.clone()),
            responses: ChatCompletionResponseSelector::new(flags.clone()),
            database,
            flags,
            generator,
        }
    }

    /// Response shape for the next completion
    ///
    /// # Errors
    ///
    /// Returns an error if flags cannot be fetched
    pub async fn completion_response(&self) -> AppResult<CompletionResponseStrategy> {
        self.responses.select().await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Chats of the caller, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller has no user row, or any repository or
    /// flag provider error
    pub async fn list_user_chats(
        &self,
        identity: &AuthenticatedUser,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<ChatSummary>> {
        let user = self.resolve_user(identity).await?;
        let page_limit = self.flags.get_usize(FeatureFlag::PaginationLimit).await?;

        let page = paginate(&self.database.user_chats(&user.id), params, page_limit).await?;
        debug!(
            user_id = %user.id,
            count = page.count,
            has_more = page.has_more,
            "Listed chats"
        );
        Ok(page.map(ChatSummary::from))
    }

    /// Message history of one of the caller's chats
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or a chat the caller does not
    /// own, or any repository or flag provider error
    pub async fn get_chat_history(
        &self,
        identity: &AuthenticatedUser,
        chat_id: &str,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<HistoryMessage>> {
        let user = self.resolve_user(identity).await?;
        let chat = self.resolve_chat(&user, chat_id).await?;

        let strategy = self.history.select().await?;
        let page_limit = self.flags.get_usize(FeatureFlag::PaginationLimit).await?;
        let page = strategy
            .history(&self.database, &chat.id, params, page_limit)
            .await?;
        debug!(chat_id = %chat.id, ?strategy, count = page.count, "Fetched chat history");
        Ok(page.map(HistoryMessage::from))
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Generate and store a reply to `prompt`, returned in one piece
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or chat, or any repository, flag
    /// provider or generator error
    pub async fn get_user_chat_completion(
        &self,
        identity: &AuthenticatedUser,
        chat_id: &str,
        prompt: &str,
    ) -> AppResult<ChatCompletionResult> {
        let user = self.resolve_user(identity).await?;
        let chat = self.resolve_chat(&user, chat_id).await?;

        let request = self.prepare_generation(&chat, prompt).await?;
        let tools = self.run_tools(&user, &chat).await?;
        let generation = self.generator.generate(&request).await?;
        let usage = self
            .record_reply(&user, &chat, &generation.text, generation.usage, &generation.model)
            .await?;

        Ok(ChatCompletionResult {
            chat_id: chat.id,
            content: generation.text,
            tools_used: tools.tools_used,
            tool_calls: tools.tool_calls,
            usage,
        })
    }

    /// Generate and store a reply to `prompt`, reported as ordered events
    ///
    /// Ownership is checked before anything is streamed, so unknown chats fail
    /// as a plain error. Failures after that become a terminal `error` event.
    /// The reply is generated and stored even if the receiver is dropped
    /// mid-stream.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or chat
    pub async fn stream_user_chat_completion(
        &self,
        identity: &AuthenticatedUser,
        chat_id: &str,
        prompt: &str,
    ) -> AppResult<mpsc::Receiver<CompletionEvent>> {
        let user = self.resolve_user(identity).await?;
        let chat = self.resolve_chat(&user, chat_id).await?;

        let (mut emitter, receiver) = CompletionEmitter::channel();
        let service = self.clone();
        let prompt = prompt.to_owned();

        tokio::spawn(async move {
            match service.run_stream(&user, &chat, &prompt, &mut emitter).await {
                Ok(()) if emitter.is_detached() => {
                    debug!(chat_id = %chat.id, "Client left before the stream ended, completion stored");
                }
                Ok(()) => {}
                Err(error) => {
                    warn!(chat_id = %chat.id, "Streamed completion failed: {error}");
                    emitter.fail(&error).await;
                }
            }
        });

        Ok(receiver)
    }

    async fn run_stream(
        &self,
        user: &UserRecord,
        chat: &ChatRecord,
        prompt: &str,
        emitter: &mut CompletionEmitter,
    ) -> AppResult<()> {
        emitter.thinking(&chat.id).await?;

        let request = self.prepare_generation(chat, prompt).await?;
        let tools = self.run_tools(user, chat).await?;
        for call in &tools.tool_calls {
            emitter.tool_execution(call).await?;
        }
        if tools.tools_used {
            emitter.tools(tools.tool_calls).await?;
        }

        let generation = self.generator.generate_stream(&request).await?;
        let mut fragments = generation.fragments;
        let mut content = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            content.push_str(&fragment);
            emitter.message(fragment).await?;
        }

        let usage = self
            .record_reply(user, chat, &content, generation.usage, &generation.model)
            .await?;
        emitter.done(&chat.id, usage).await
    }

    // ========================================================================
    // Pipeline Steps
    // ========================================================================

    async fn resolve_user(&self, identity: &AuthenticatedUser) -> AppResult<UserRecord> {
        self.database
            .get_user(&identity.id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn resolve_chat(&self, user: &UserRecord, chat_id: &str) -> AppResult<ChatRecord> {
        self.database
            .get_chat_for_user(&user.id, chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Chat"))
    }

    /// Store the prompt and collect the earlier messages sent as context
    async fn prepare_generation(
        &self,
        chat: &ChatRecord,
        prompt: &str,
    ) -> AppResult<GenerationRequest> {
        let prompt_message = self
            .database
            .create_message(&chat.id, MessageRole::User, prompt)
            .await?;

        let messages = if self.flags.is_enabled(FeatureFlag::ChatHistoryEnabled).await? {
            let limit = self.flags.get_usize(FeatureFlag::ChatHistoryLimit).await?;
            self.database
                .messages_before(&prompt_message, limit)
                .await?
                .into_iter()
                .map(|message| ContextMessage::new(message.role, message.content))
                .collect()
        } else {
            Vec::new()
        };

        Ok(GenerationRequest::new(prompt, messages))
    }

    async fn run_tools(&self, user: &UserRecord, chat: &ChatRecord) -> AppResult<ToolExecutionResult> {
        let strategy = self.tools.select().await?;
        Ok(strategy.execute(ToolExecutionContext {
            chat_id: &chat.id,
            user_id: &user.id,
        }))
    }

    /// Store the reply and its token usage
    async fn record_reply(
        &self,
        user: &UserRecord,
        chat: &ChatRecord,
        content: &str,
        usage: TokenUsage,
        model: &str,
    ) -> AppResult<CompletionUsage> {
        let reply = self
            .database
            .create_message(&chat.id, MessageRole::Assistant, content)
            .await?;

        self.database
            .create_token_usage(&NewTokenUsage {
                user_id: user.id.clone(),
                chat_id: chat.id.clone(),
                message_id: Some(reply.id),
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                total_tokens: usage.total_tokens,
                model: model.to_owned(),
            })
            .await?;

        info!(
            chat_id = %chat.id,
            generator = self.generator.name(),
            total_tokens = usage.total_tokens,
            "Completion stored"
        );
        Ok(CompletionUsage::new(usage, model))
    }
}
