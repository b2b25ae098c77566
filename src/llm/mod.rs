// ABOUTME: Text generation abstraction used by chat completions
// ABOUTME: Defines the generator contract with buffered and streaming variants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Text Generation
//!
//! Chat completions talk to a [`TextGenerator`]. The server ships a single
//! deterministic implementation, [`MockTextGenerator`], so completions are
//! reproducible in development and tests.
//!
//! ```rust,no_run
//! use chatrail_server::llm::{GenerationRequest, MockTextGenerator, TextGenerator};
//!
//! async fn example() {
//!     let generator = MockTextGenerator::default();
//!     let request = GenerationRequest::new("Summarize my week", Vec::new());
//!     let generation = generator.generate(&request).await;
//! }
//! ```

mod mock;

pub use mock::{count_tokens, split_into_chunks, MockTextGenerator};

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::database::MessageRole;
use crate::errors::AppError;

// ============================================================================
// Request / Response Types
// ============================================================================

/// One prior turn of the conversation passed as context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    /// Who produced the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ContextMessage {
    /// Create a context message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Input for a single generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user's prompt
    pub prompt: String,
    /// Earlier messages in chronological order
    pub messages: Vec<ContextMessage>,
}

impl GenerationRequest {
    /// Create a request from a prompt and its context
    #[must_use]
    pub fn new(prompt: impl Into<String>, messages: Vec<ContextMessage>) -> Self {
        Self {
            prompt: prompt.into(),
            messages,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub input_tokens: u32,
    /// Tokens in the generated text
    pub output_tokens: u32,
    /// Sum of input and output
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build usage from input and output counts
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// Result of a buffered generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// Full generated text
    pub text: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Model that produced the text
    pub model: String,
}

/// Stream of generated text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Result of a streaming generation
///
/// Concatenating every fragment of `fragments` yields the full text.
pub struct StreamingGeneration {
    /// Model producing the fragments
    pub model: String,
    /// Token usage for the whole generation
    pub usage: TokenUsage,
    /// Text fragments in order
    pub fragments: TextStream,
}

// ============================================================================
// Generator Trait
// ============================================================================

/// Text generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator identifier used in logs
    fn name(&self) -> &'static str;

    /// Model name recorded with token usage
    fn model(&self) -> &str;

    /// Generate the whole reply at once
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AppError>;

    /// Generate the reply as a stream of fragments
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingGeneration, AppError>;
}
