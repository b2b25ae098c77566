// ABOUTME: Tool strategies selected by AI_TOOLS_ENABLED
// ABOUTME: The enabled strategy runs the mock search tool for the chat
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde_json::json;
use tracing::debug;

use crate::chats::types::ToolCall;
use crate::errors::AppResult;
use crate::feature_flags::{FeatureFlag, FeatureFlagService};

/// Name of the only tool in the mock tool set
pub const MOCK_SEARCH_TOOL: &str = "mock.search";

/// Who a tool run is for
#[derive(Debug, Clone, Copy)]
pub struct ToolExecutionContext<'a> {
    /// Chat being completed
    pub chat_id: &'a str,
    /// Owner of the chat
    pub user_id: &'a str,
}

/// Outcome of running the tool strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolExecutionResult {
    /// Whether any tool ran
    pub tools_used: bool,
    /// Calls made, in order
    pub tool_calls: Vec<ToolCall>,
}

/// Whether tools run before generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStrategy {
    /// Run the tool set
    Enabled,
    /// Skip tools
    Disabled,
}

impl ToolStrategy {
    /// Strategy for an `AI_TOOLS_ENABLED` value
    #[must_use]
    pub const fn for_flag(tools_enabled: bool) -> Self {
        if tools_enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Run the strategy
    #[must_use]
    pub fn execute(self, context: ToolExecutionContext<'_>) -> ToolExecutionResult {
        match self {
            Self::Enabled => {
                debug!(
                    chat_id = context.chat_id,
                    user_id = context.user_id,
                    tool = MOCK_SEARCH_TOOL,
                    "Running tool"
                );
                ToolExecutionResult {
                    tools_used: true,
                    tool_calls: vec![ToolCall {
                        name: MOCK_SEARCH_TOOL.to_owned(),
                        input: json!({
                            "query": format!("latest updates for chat {}", context.chat_id),
                        }),
                        output: json!({
                            "summary": "Mocked search result for demo purposes.",
                        }),
                    }],
                }
            }
            Self::Disabled => ToolExecutionResult::default(),
        }
    }
}

/// Picks the tool strategy from the current flag value
#[derive(Clone)]
pub struct ToolStrategySelector {
    flags: FeatureFlagService,
}

impl ToolStrategySelector {
    /// Create a selector
    #[must_use]
    pub fn new(flags: FeatureFlagService) -> Self {
        Self { flags }
    }

    /// Strategy for this request
    ///
    /// # Errors
    ///
    /// Returns an error if flags cannot be fetched
    pub async fn select(&self) -> AppResult<ToolStrategy> {
        let enabled = self.flags.is_enabled(FeatureFlag::AiToolsEnabled).await?;
        Ok(ToolStrategy::for_flag(enabled))
    }
}
