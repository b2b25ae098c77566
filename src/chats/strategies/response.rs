// ABOUTME: Completion response strategies selected by STREAMING_ENABLED
// ABOUTME: Server-Sent Events when streaming is on, a single JSON body otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppResult;
use crate::feature_flags::{FeatureFlag, FeatureFlagService};

/// Shape of a completion response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionResponseStrategy {
    /// Ordered SSE events ending in `done` or `error`
    Streaming,
    /// One buffered `ChatCompletionResult`
    Json,
}

impl CompletionResponseStrategy {
    /// Strategy for a `STREAMING_ENABLED` value
    #[must_use]
    pub const fn for_flag(streaming_enabled: bool) -> Self {
        if streaming_enabled {
            Self::Streaming
        } else {
            Self::Json
        }
    }

    /// Whether this strategy streams
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// Picks the response strategy from the current flag value
#[derive(Clone)]
pub struct ChatCompletionResponseSelector {
    flags: FeatureFlagService,
}

impl ChatCompletionResponseSelector {
    /// Create a selector
    #[must_use]
    pub fn new(flags: FeatureFlagService) -> Self {
        Self { flags }
    }

    /// Whether completions should stream, checked before any work is done
    ///
    /// # Errors
    ///
    /// Returns an error if flags cannot be fetched
    pub async fn is_streaming_enabled(&self) -> AppResult<bool> {
        self.flags.is_enabled(FeatureFlag::StreamingEnabled).await
    }

    /// Strategy for this request
    ///
    /// # Errors
    ///
    /// Returns an error if flags cannot be fetched
    pub async fn select(&self) -> AppResult<CompletionResponseStrategy> {
        Ok(CompletionResponseStrategy::for_flag(
            self.is_streaming_enabled().await?,
        ))
    }
}
