// ABOUTME: Chat history strategies selected by CHAT_HISTORY_ENABLED
// ABOUTME: Full paginated history or a fixed window of the most recent messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::pagination::RECENT_MESSAGES_LIMIT;
use crate::database::{Database, MessageRecord};
use crate::errors::AppResult;
use crate::feature_flags::{FeatureFlag, FeatureFlagService};
use crate::pagination::{paginate, CursorPage, PageCursor, PageSource, PaginationParams};

/// How chat history is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatHistoryStrategy {
    /// Cursor-paginated history, newest first
    Full,
    /// The most recent messages only, in chronological order, never paginated
    Recent,
}

impl ChatHistoryStrategy {
    /// Strategy for a `CHAT_HISTORY_ENABLED` value
    #[must_use]
    pub const fn for_flag(history_enabled: bool) -> Self {
        if history_enabled {
            Self::Full
        } else {
            Self::Recent
        }
    }

    /// Fetch one page of history for `chat_id`
    ///
    /// `page_limit` caps the page size of [`Self::Full`]; [`Self::Recent`]
    /// ignores `params` and always serves a single page.
    ///
    /// # Errors
    ///
    /// Returns an error if a repository query fails
    pub async fn history(
        self,
        database: &Database,
        chat_id: &str,
        params: &PaginationParams,
        page_limit: usize,
    ) -> AppResult<CursorPage<MessageRecord>> {
        match self {
            Self::Full => paginate(&database.chat_messages(chat_id), params, page_limit).await,
            Self::Recent => {
                let messages = database
                    .recent_messages(chat_id, RECENT_MESSAGES_LIMIT)
                    .await?;
                let total = database.chat_messages(chat_id).count_total().await?;
                Ok(CursorPage::new(
                    messages,
                    1,
                    RECENT_MESSAGES_LIMIT,
                    total,
                    false,
                    PageCursor::default(),
                ))
            }
        }
    }
}

/// Picks the history strategy from the current flag value
#[derive(Clone)]
pub struct ChatHistoryStrategySelector {
    flags: FeatureFlagService,
}

impl ChatHistoryStrategySelector {
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
    pub async fn select(&self) -> AppResult<ChatHistoryStrategy> {
        let enabled = self.flags.is_enabled(FeatureFlag::ChatHistoryEnabled).await?;
        Ok(ChatHistoryStrategy::for_flag(enabled))
    }
}
