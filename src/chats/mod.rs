// ABOUTME: Chat domain: completion result types, flag-selected strategies and SSE events
// ABOUTME: The chat service in crate::services composes these per request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Ordered completion events and their emitter
pub mod events;
/// History, tool and response strategies
pub mod strategies;
/// Completion result and response shapes
pub mod types;

pub use events::{CompletionEmitter, CompletionEvent, EmitterState, ToolPhase};
pub use strategies::{
    ChatCompletionResponseSelector, ChatHistoryStrategy, ChatHistoryStrategySelector,
    CompletionResponseStrategy, ToolExecutionContext, ToolExecutionResult, ToolStrategy,
    ToolStrategySelector, MOCK_SEARCH_TOOL,
};
pub use types::{ChatCompletionResult, ChatSummary, CompletionUsage, HistoryMessage, ToolCall};
