// ABOUTME: Flag-selected strategies for history retrieval, tool use and response shape
// ABOUTME: Each strategy is a closed enum chosen by a pure function of one flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Strategy selectors
//!
//! Every selector re-reads its flag on each call, so flipping a flag changes
//! behavior on the next request.

mod history;
mod response;
mod tools;

pub use history::{ChatHistoryStrategy, ChatHistoryStrategySelector};
pub use response::{ChatCompletionResponseSelector, CompletionResponseStrategy};
pub use tools::{
    ToolExecutionContext, ToolExecutionResult, ToolStrategy, ToolStrategySelector,
    MOCK_SEARCH_TOOL,
};
