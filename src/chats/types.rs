// ABOUTME: Chat completion result and response shapes returned to clients
// ABOUTME: All wire types serialize in camelCase
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::{ChatRecord, MessageRecord, MessageRole};
use crate::llm::TokenUsage;

/// One tool invocation made while preparing a completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Arguments passed to the tool
    pub input: Value,
    /// Tool result
    pub output: Value,
}

/// Token usage reported with a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Generated tokens
    pub output_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
    /// Model that generated the reply
    pub model: String,
}

impl CompletionUsage {
    /// Attach a model name to generator usage
    #[must_use]
    pub fn new(usage: TokenUsage, model: impl Into<String>) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            model: model.into(),
        }
    }
}

/// Buffered completion returned when streaming is disabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionResult {
    /// Chat the completion belongs to
    pub chat_id: String,
    /// Generated reply
    pub content: String,
    /// Whether any tool ran
    pub tools_used: bool,
    /// Tool invocations, empty when tools are disabled
    pub tool_calls: Vec<ToolCall>,
    /// Token usage
    pub usage: CompletionUsage,
}

/// Chat as listed to its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat id
    pub id: String,
    /// Chat title
    pub title: String,
}

impl From<ChatRecord> for ChatSummary {
    fn from(chat: ChatRecord) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
        }
    }
}

/// Message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Message id
    pub id: String,
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
}

impl From<MessageRecord> for HistoryMessage {
    fn from(message: MessageRecord) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
        }
    }
}
