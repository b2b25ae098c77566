// ABOUTME: Chat repository operations and the per-user chat page source
// ABOUTME: Chats are ordered newest-activity first by (updated_at desc, id desc)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{now_timestamp, timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::pagination::{PageAnchor, PageSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRecord {
    /// Chat id
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Chat title
    pub title: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Time of the last message or rename (RFC 3339)
    pub updated_at: String,
}

impl ChatRecord {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

// ============================================================================
// Chat Operations
// ============================================================================

impl Database {
    /// Create a chat for `user_id` stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the insert fails
    pub async fn create_chat(&self, user_id: &str, title: &str) -> AppResult<ChatRecord> {
        self.insert_chat(user_id, title, now_timestamp()).await
    }

    /// Create a chat with an explicit creation time, used for seeding
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the insert fails
    pub async fn create_chat_at(
        &self,
        user_id: &str,
        title: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ChatRecord> {
        self.insert_chat(user_id, title, timestamp(at)).await
    }

    async fn insert_chat(&self, user_id: &str, title: &str, at: String) -> AppResult<ChatRecord> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r"
            INSERT INTO chats (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(&at)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat: {e}")))?;

        Ok(ChatRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            created_at: at.clone(),
            updated_at: at,
        })
    }

    /// Find a chat only if it belongs to `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_chat_for_user(
        &self,
        user_id: &str,
        chat_id: &str,
    ) -> AppResult<Option<ChatRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, created_at, updated_at
            FROM chats
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get chat: {e}")))?;

        Ok(row.as_ref().map(ChatRecord::from_row))
    }

    /// Page source over the chats of `user_id`
    #[must_use]
    pub fn user_chats(&self, user_id: &str) -> UserChatsSource {
        UserChatsSource {
            pool: self.pool().clone(),
            user_id: user_id.to_owned(),
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Chats of one user, newest activity first
pub struct UserChatsSource {
    pool: SqlitePool,
    user_id: String,
}

#[async_trait::async_trait]
impl PageSource for UserChatsSource {
    type Row = ChatRecord;

    async fn find_anchor(&self, cursor: &str) -> AppResult<Option<PageAnchor>> {
        let row = sqlx::query("SELECT id, updated_at FROM chats WHERE id = $1 AND user_id = $2")
            .bind(cursor)
            .bind(&self.user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to resolve chat cursor: {e}")))?;

        Ok(row.map(|r| PageAnchor {
            id: r.get("id"),
            sort_key: r.get("updated_at"),
        }))
    }

    async fn fetch_after(
        &self,
        anchor: Option<&PageAnchor>,
        limit: usize,
    ) -> AppResult<Vec<ChatRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match anchor {
            Some(anchor) => {
                sqlx::query(
                    r"
                    SELECT id, user_id, title, created_at, updated_at
                    FROM chats
                    WHERE user_id = $1
                      AND (updated_at < $2 OR (updated_at = $2 AND id < $3))
                    ORDER BY updated_at DESC, id DESC
                    LIMIT $4
                    ",
                )
                .bind(&self.user_id)
                .bind(&anchor.sort_key)
                .bind(&anchor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                    SELECT id, user_id, title, created_at, updated_at
                    FROM chats
                    WHERE user_id = $1
                    ORDER BY updated_at DESC, id DESC
                    LIMIT $2
                    ",
                )
                .bind(&self.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list chats: {e}")))?;

        Ok(rows.iter().map(ChatRecord::from_row).collect())
    }

    async fn count_at_or_before(&self, anchor: &PageAnchor) -> AppResult<u64> {
        let count: i64 = sqlx::query(
            r"
            SELECT COUNT(*) FROM chats
            WHERE user_id = $1
              AND (updated_at > $2 OR (updated_at = $2 AND id >= $3))
            ",
        )
        .bind(&self.user_id)
        .bind(&anchor.sort_key)
        .bind(&anchor.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count chats: {e}")))?
        .get(0);

        Ok(count.max(0) as u64)
    }

    async fn count_total(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM chats WHERE user_id = $1")
            .bind(&self.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count chats: {e}")))?
            .get(0);

        Ok(count.max(0) as u64)
    }

    fn row_id(row: &ChatRecord) -> &str {
        &row.id
    }
}
