// ABOUTME: User repository operations
// ABOUTME: Lookup by id plus creation helpers used for seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Database representation of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// User id, also the identity id from authentication
    pub id: String,
    /// Unique email address
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

impl UserRecord {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

impl Database {
    /// Create a user with a generated id
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken or the insert fails
    pub async fn create_user(&self, email: &str, name: Option<&str>) -> AppResult<UserRecord> {
        self.create_user_with_id(&Uuid::new_v4().to_string(), email, name)
            .await
    }

    /// Create a user with a caller-chosen id
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email is taken or the insert fails
    pub async fn create_user_with_id(
        &self,
        id: &str,
        email: &str,
        name: Option<&str>,
    ) -> AppResult<UserRecord> {
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO users (id, email, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        Ok(UserRecord {
            id: id.to_owned(),
            email: email.to_owned(),
            name: name.map(ToOwned::to_owned),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user(&self, id: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        Ok(row.as_ref().map(UserRecord::from_row))
    }
}
