// ABOUTME: Message repository operations and the per-chat message page source
// ABOUTME: Messages are immutable and ordered by (created_at, id)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::pagination::{PageAnchor, PageSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Prompt written by the user
    User,
    /// Generated reply
    Assistant,
}

impl MessageRole {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(AppError::database(format!("Unknown message role '{other}'"))),
        }
    }
}

/// Database representation of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message id
    pub id: String,
    /// Chat the message belongs to
    pub chat_id: String,
    /// Author
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

impl MessageRecord {
    fn from_row(row: &SqliteRow) -> AppResult<Self> {
        let role: String = row.get("role");
        Ok(Self {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            role: role.parse()?,
            content: row.get("content"),
            created_at: row.get("created_at"),
        })
    }

    fn from_rows(rows: &[SqliteRow]) -> AppResult<Vec<Self>> {
        rows.iter().map(Self::from_row).collect()
    }
}

const MESSAGE_COLUMNS: &str = "id, chat_id, role, content, created_at";

impl Database {
    /// Append a message stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns an error if the chat does not exist or the insert fails
    pub async fn create_message(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<MessageRecord> {
        self.create_message_at(chat_id, role, content, Utc::now())
            .await
    }

    /// Append a message with an explicit time and bump the chat's `updated_at`
    ///
    /// # Errors
    ///
    /// Returns an error if the chat does not exist or a statement fails
    pub async fn create_message_at(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = timestamp(at);

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO messages (id, chat_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create message: {e}")))?;

        // Never move updated_at backwards when seeding older messages
        sqlx::query("UPDATE chats SET updated_at = MAX(updated_at, $1) WHERE id = $2")
            .bind(&created_at)
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to update chat: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit message: {e}")))?;

        Ok(MessageRecord {
            id,
            chat_id: chat_id.to_owned(),
            role,
            content: content.to_owned(),
            created_at,
        })
    }

    /// The `limit` most recent messages, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn recent_messages(&self, chat_id: &str, limit: usize) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        ))
        .bind(chat_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get recent messages: {e}")))?;

        let mut messages = MessageRecord::from_rows(&rows)?;
        messages.reverse();
        Ok(messages)
    }

    /// Up to `limit` messages strictly older than `before`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn messages_before(
        &self,
        before: &MessageRecord,
        limit: usize,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
             AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
             ORDER BY created_at DESC, id DESC LIMIT $4"
        ))
        .bind(&before.chat_id)
        .bind(&before.created_at)
        .bind(&before.id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get earlier messages: {e}")))?;

        let mut messages = MessageRecord::from_rows(&rows)?;
        messages.reverse();
        Ok(messages)
    }

    /// Page source over the messages of `chat_id`
    #[must_use]
    pub fn chat_messages(&self, chat_id: &str) -> ChatMessagesSource {
        ChatMessagesSource {
            pool: self.pool().clone(),
            chat_id: chat_id.to_owned(),
        }
    }
}

/// Messages of one chat, newest first
pub struct ChatMessagesSource {
    pool: SqlitePool,
    chat_id: String,
}

#[async_trait::async_trait]
impl PageSource for ChatMessagesSource {
    type Row = MessageRecord;

    async fn find_anchor(&self, cursor: &str) -> AppResult<Option<PageAnchor>> {
        let row =
            sqlx::query("SELECT id, created_at FROM messages WHERE id = $1 AND chat_id = $2")
                .bind(cursor)
                .bind(&self.chat_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to resolve message cursor: {e}"))
                })?;

        Ok(row.map(|r| PageAnchor {
            id: r.get("id"),
            sort_key: r.get("created_at"),
        }))
    }

    async fn fetch_after(
        &self,
        anchor: Option<&PageAnchor>,
        limit: usize,
    ) -> AppResult<Vec<MessageRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match anchor {
            Some(anchor) => {
                sqlx::query(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
                     AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC LIMIT $4"
                ))
                .bind(&self.chat_id)
                .bind(&anchor.sort_key)
                .bind(&anchor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2"
                ))
                .bind(&self.chat_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list messages: {e}")))?;

        MessageRecord::from_rows(&rows)
    }

    async fn count_at_or_before(&self, anchor: &PageAnchor) -> AppResult<u64> {
        let count: i64 = sqlx::query(
            r"
            SELECT COUNT(*) FROM messages
            WHERE chat_id = $1
              AND (created_at > $2 OR (created_at = $2 AND id >= $3))
            ",
        )
        .bind(&self.chat_id)
        .bind(&anchor.sort_key)
        .bind(&anchor.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count messages: {e}")))?
        .get(0);

        Ok(count.max(0) as u64)
    }

    async fn count_total(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(&self.chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count messages: {e}")))?
            .get(0);

        Ok(count.max(0) as u64)
    }

    fn row_id(row: &MessageRecord) -> &str {
        &row.id
    }
}
