// ABOUTME: Typed completion events and the emitter enforcing their order
// ABOUTME: Events flow over a tokio channel that the SSE route drains
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Completion Events
//!
//! A streamed completion is the ordered sequence
//! `thinking → (tool_execution start/complete)* → tool? → message* → done | error`.
//! [`CompletionEmitter`] is the only writer; it rejects out-of-order events and
//! guarantees that nothing follows the terminal event. When the receiver goes
//! away the emitter detaches: later events are still checked for order but
//! are dropped, so the producer can finish its work without a listener.

use std::fmt;

use axum::response::sse::Event;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use super::types::{CompletionUsage, ToolCall};
use crate::errors::{AppError, AppResult};

/// Buffered events between the producer task and the HTTP response
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Phase of a single tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPhase {
    /// Tool invoked
    Start,
    /// Tool returned
    Complete,
}

/// One event of a streamed completion
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    /// Work on the completion has begun
    Thinking {
        /// Chat being completed
        chat_id: String,
    },
    /// A tool started or finished
    ToolExecution {
        /// Start or complete
        phase: ToolPhase,
        /// The call; `output` is null on start
        call: ToolCall,
    },
    /// Summary of every tool call
    Tool {
        /// All calls made
        tool_calls: Vec<ToolCall>,
    },
    /// A fragment of the generated reply
    Message {
        /// Text fragment
        chunk: String,
    },
    /// Completion finished and was stored
    Done {
        /// Chat id
        chat_id: String,
        /// Token usage
        usage: CompletionUsage,
    },
    /// Completion failed
    Error {
        /// Client-safe description
        message: String,
    },
}

impl CompletionEvent {
    /// SSE `event:` name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::ToolExecution { .. } => "tool_execution",
            Self::Tool { .. } => "tool",
            Self::Message { .. } => "message",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// SSE `data:` payload
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Thinking { chat_id } => json!({ "chatId": chat_id }),
            Self::ToolExecution { phase, call } => match phase {
                ToolPhase::Start => json!({
                    "status": phase,
                    "name": call.name,
                    "input": call.input,
                }),
                ToolPhase::Complete => json!({
                    "status": phase,
                    "name": call.name,
                    "output": call.output,
                }),
            },
            Self::Tool { tool_calls } => json!({ "toolCalls": tool_calls }),
            Self::Message { chunk } => json!({ "chunk": chunk }),
            Self::Done { chat_id, usage } => json!({ "chatId": chat_id, "usage": usage }),
            Self::Error { message } => json!({ "message": message }),
        }
    }

    /// Whether the stream ends after this event
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Render as an axum SSE event
    #[must_use]
    pub fn to_sse_event(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

/// Position of an emitter in the event sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Nothing sent yet
    Idle,
    /// `thinking` sent
    Thinking,
    /// A tool started and has not completed
    ToolRunning,
    /// Every started tool has completed
    ToolsIdle,
    /// Tool summary sent
    ToolsReported,
    /// At least one message fragment sent
    Streaming,
    /// Terminal event sent
    Finished,
}

impl fmt::Display for EmitterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::ToolRunning => "tool running",
            Self::ToolsIdle => "tools idle",
            Self::ToolsReported => "tools reported",
            Self::Streaming => "streaming",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

impl EmitterState {
    /// State after `event`, or `None` when `event` may not follow this state
    #[must_use]
    pub const fn advance(self, event: &CompletionEvent) -> Option<Self> {
        use CompletionEvent as E;
        match (self, event) {
            (Self::Finished, _) => None,
            (_, E::Error { .. }) => Some(Self::Finished),
            (Self::Idle, E::Thinking { .. }) => Some(Self::Thinking),
            (
                Self::Thinking | Self::ToolsIdle,
                E::ToolExecution {
                    phase: ToolPhase::Start,
                    ..
                },
            ) => Some(Self::ToolRunning),
            (
                Self::ToolRunning,
                E::ToolExecution {
                    phase: ToolPhase::Complete,
                    ..
                },
            ) => Some(Self::ToolsIdle),
            (Self::Thinking | Self::ToolsIdle, E::Tool { .. }) => Some(Self::ToolsReported),
            (
                Self::Thinking | Self::ToolsIdle | Self::ToolsReported | Self::Streaming,
                E::Message { .. },
            ) => Some(Self::Streaming),
            (
                Self::Thinking | Self::ToolsIdle | Self::ToolsReported | Self::Streaming,
                E::Done { .. },
            ) => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Single writer of a completion event stream
pub struct CompletionEmitter {
    sender: mpsc::Sender<CompletionEvent>,
    state: EmitterState,
    detached: bool,
}

impl CompletionEmitter {
    /// Create an emitter and the receiver the transport drains
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<CompletionEvent>) {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                sender,
                state: EmitterState::Idle,
                detached: false,
            },
            receiver,
        )
    }

    /// Current position in the sequence
    #[must_use]
    pub const fn state(&self) -> EmitterState {
        self.state
    }

    /// Whether a terminal event was sent
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == EmitterState::Finished
    }

    /// Whether the receiver was dropped, so events are no longer delivered
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    /// Send `event` if it may follow the events already sent
    ///
    /// A dropped receiver detaches the emitter instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the event is out of order
    pub async fn emit(&mut self, event: CompletionEvent) -> AppResult<()> {
        let next = self.state.advance(&event).ok_or_else(|| {
            AppError::internal(format!(
                "Completion event '{}' cannot follow state '{}'",
                event.name(),
                self.state
            ))
        })?;

        if !self.detached && self.sender.send(event).await.is_err() {
            debug!("Completion stream receiver closed, dropping further events");
            self.detached = true;
        }
        self.state = next;
        Ok(())
    }

    /// Emit `thinking`
    ///
    /// # Errors
    ///
    /// See [`Self::emit`]
    pub async fn thinking(&mut self, chat_id: &str) -> AppResult<()> {
        self.emit(CompletionEvent::Thinking {
            chat_id: chat_id.to_owned(),
        })
        .await
    }

    /// Emit the start/complete pair for one tool call
    ///
    /// # Errors
    ///
    /// See [`Self::emit`]
    pub async fn tool_execution(&mut self, call: &ToolCall) -> AppResult<()> {
        let started = ToolCall {
            output: serde_json::Value::Null,
            ..call.clone()
        };
        self.emit(CompletionEvent::ToolExecution {
            phase: ToolPhase::Start,
            call: started,
        })
        .await?;
        self.emit(CompletionEvent::ToolExecution {
            phase: ToolPhase::Complete,
            call: call.clone(),
        })
        .await
    }

    /// Emit the tool summary
    ///
    /// # Errors
    ///
    /// See [`Self::emit`]
    pub async fn tools(&mut self, tool_calls: Vec<ToolCall>) -> AppResult<()> {
        self.emit(CompletionEvent::Tool { tool_calls }).await
    }

    /// Emit one reply fragment
    ///
    /// # Errors
    ///
    /// See [`Self::emit`]
    pub async fn message(&mut self, chunk: String) -> AppResult<()> {
        self.emit(CompletionEvent::Message { chunk }).await
    }

    /// Emit the terminal `done`
    ///
    /// # Errors
    ///
    /// See [`Self::emit`]
    pub async fn done(&mut self, chat_id: &str, usage: CompletionUsage) -> AppResult<()> {
        self.emit(CompletionEvent::Done {
            chat_id: chat_id.to_owned(),
            usage,
        })
        .await
    }

    /// Emit the terminal `error`; a no-op once the stream has finished
    pub async fn fail(&mut self, error: &AppError) {
        if self.is_finished() {
            return;
        }
        let message = if error.code.is_server_error() {
            error.code.description().to_owned()
        } else {
            error.message.clone()
        };
        // Error always follows a non-terminal state
        let _ = self.emit(CompletionEvent::Error { message }).await;
    }
}
