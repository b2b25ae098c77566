// ABOUTME: Compiled-in feature flag definitions with kinds, defaults and numeric bounds
// ABOUTME: The closed FeatureFlag enum is the only way to name a recognized flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppError;
use std::fmt;
use std::str::FromStr;

/// Schema of one flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagDefinition {
    /// On/off switch
    Boolean {
        /// Value used when the source is missing or invalid
        default: bool,
    },
    /// Bounded number
    Number {
        /// Value used when the source is missing, invalid or out of range
        default: f64,
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
    },
}

impl FlagDefinition {
    /// Whether `value` lies within the bounds
    #[must_use]
    pub fn in_range(&self, value: f64) -> bool {
        match *self {
            Self::Boolean { .. } => false,
            Self::Number { min, max, .. } => {
                min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
            }
        }
    }
}

/// Recognized feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureFlag {
    /// Stream completions as SSE instead of a single JSON body
    StreamingEnabled,
    /// Page size cap for chat listing and history
    PaginationLimit,
    /// Run the tool set before generating a completion
    AiToolsEnabled,
    /// Paginated history instead of the recent window, and history as model context
    ChatHistoryEnabled,
    /// Number of earlier messages sent as model context
    ChatHistoryLimit,
    /// Requests per user per rate limit window
    RateLimitPerMinute,
}

impl FeatureFlag {
    /// Every recognized flag
    pub const ALL: [Self; 6] = [
        Self::StreamingEnabled,
        Self::PaginationLimit,
        Self::AiToolsEnabled,
        Self::ChatHistoryEnabled,
        Self::ChatHistoryLimit,
        Self::RateLimitPerMinute,
    ];

    /// Key used in flag sources
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::StreamingEnabled => "STREAMING_ENABLED",
            Self::PaginationLimit => "PAGINATION_LIMIT",
            Self::AiToolsEnabled => "AI_TOOLS_ENABLED",
            Self::ChatHistoryEnabled => "CHAT_HISTORY_ENABLED",
            Self::ChatHistoryLimit => "CHAT_HISTORY_LIMIT",
            Self::RateLimitPerMinute => "RATE_LIMIT_PER_MINUTE",
        }
    }

    /// Look up a flag by its source key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.key() == key)
    }

    /// Compiled-in definition
    #[must_use]
    pub const fn definition(self) -> FlagDefinition {
        match self {
            Self::StreamingEnabled => FlagDefinition::Boolean { default: true },
            Self::PaginationLimit => FlagDefinition::Number {
                default: 20.0,
                min: Some(10.0),
                max: Some(100.0),
            },
            Self::AiToolsEnabled => FlagDefinition::Boolean { default: false },
            Self::ChatHistoryEnabled => FlagDefinition::Boolean { default: true },
            Self::ChatHistoryLimit => FlagDefinition::Number {
                default: 10.0,
                min: Some(1.0),
                max: Some(100.0),
            },
            Self::RateLimitPerMinute => FlagDefinition::Number {
                default: 60.0,
                min: Some(1.0),
                max: Some(1000.0),
            },
        }
    }

    /// Whether the flag is an on/off switch
    #[must_use]
    pub const fn is_boolean(self) -> bool {
        matches!(self.definition(), FlagDefinition::Boolean { .. })
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FeatureFlag {
    type Err = AppError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Self::from_key(key)
            .ok_or_else(|| AppError::invalid_input(format!("Unknown feature flag: {key}")))
    }
}
