// ABOUTME: Token usage repository recording model consumption per completion
// ABOUTME: Supports per-user and per-chat listings plus aggregated totals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{now_timestamp, timestamp, Database};
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Usage to record for one completion
#[derive(Debug, Clone)]
pub struct NewTokenUsage {
    /// User the completion was generated for
    pub user_id: String,
    /// Chat the completion belongs to
    pub chat_id: String,
    /// Assistant message carrying the completion
    pub message_id: Option<String>,
    /// Prompt tokens
    pub input_tokens: u32,
    /// Completion tokens
    pub output_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
    /// Model that produced the completion
    pub model: String,
}

/// Database representation of a usage record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsageRecord {
    /// Record id
    pub id: String,
    /// User id
    pub user_id: String,
    /// Chat id
    pub chat_id: String,
    /// Assistant message id
    pub message_id: Option<String>,
    /// Prompt tokens
    pub input_tokens: i64,
    /// Completion tokens
    pub output_tokens: i64,
    /// Sum of both
    pub total_tokens: i64,
    /// Model name
    pub model: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

impl TokenUsageRecord {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            user_id: row.get("user_id"),
            chat_id: row.get("chat_id"),
            message_id: row.get("message_id"),
            input_tokens: row.get("input_tokens"),
            output_tokens: row.get("output_tokens"),
            total_tokens: row.get("total_tokens"),
            model: row.get("model"),
            created_at: row.get("created_at"),
        }
    }
}

/// Aggregated usage of one user
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageTotals {
    /// Sum of prompt tokens
    pub input_tokens: i64,
    /// Sum of completion tokens
    pub output_tokens: i64,
    /// Sum of all tokens
    pub total_tokens: i64,
}

impl Database {
    /// Record token usage
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_token_usage(&self, usage: &NewTokenUsage) -> AppResult<TokenUsageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO token_usage (id, user_id, chat_id, message_id, input_tokens, output_tokens, total_tokens, model, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&id)
        .bind(&usage.user_id)
        .bind(&usage.chat_id)
        .bind(usage.message_id.as_deref())
        .bind(i64::from(usage.input_tokens))
        .bind(i64::from(usage.output_tokens))
        .bind(i64::from(usage.total_tokens))
        .bind(&usage.model)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to record token usage: {e}")))?;

        Ok(TokenUsageRecord {
            id,
            user_id: usage.user_id.clone(),
            chat_id: usage.chat_id.clone(),
            message_id: usage.message_id.clone(),
            input_tokens: i64::from(usage.input_tokens),
            output_tokens: i64::from(usage.output_tokens),
            total_tokens: i64::from(usage.total_tokens),
            model: usage.model.clone(),
            created_at: now,
        })
    }

    /// Usage records of a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn token_usage_by_user(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> AppResult<Vec<TokenUsageRecord>> {
        // SQLite treats a negative LIMIT as unlimited
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
            SELECT id, user_id, chat_id, message_id, input_tokens, output_tokens, total_tokens, model, created_at
            FROM token_usage
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list token usage: {e}")))?;

        Ok(rows.iter().map(TokenUsageRecord::from_row).collect())
    }

    /// Usage records of a chat, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn token_usage_by_chat(&self, chat_id: &str) -> AppResult<Vec<TokenUsageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, chat_id, message_id, input_tokens, output_tokens, total_tokens, model, created_at
            FROM token_usage
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(chat_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list token usage: {e}")))?;

        Ok(rows.iter().map(TokenUsageRecord::from_row).collect())
    }

    /// Summed usage of a user, optionally only records created at or after `since`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn total_usage_by_user(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<TokenUsageTotals> {
        let since = since.map_or_else(String::new, timestamp);
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(input_tokens), 0) AS input_tokens,
                   COALESCE(SUM(output_tokens), 0) AS output_tokens,
                   COALESCE(SUM(total_tokens), 0) AS total_tokens
            FROM token_usage
            WHERE user_id = $1 AND created_at >= $2
            ",
        )
        .bind(user_id)
        .bind(&since)
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to total token usage: {e}")))?;

        Ok(TokenUsageTotals {
            input_tokens: row.get("input_tokens"),
            output_tokens: row.get("output_tokens"),
            total_tokens: row.get("total_tokens"),
        })
    }
}
