// ABOUTME: SQLite implementation of the token store
// ABOUTME: Inline migration, UNIQUE hash constraint, and row conversion helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! SQLite-backed [`TokenStore`] built on `sqlx`. Scope is stored
//! relationally: `team_id` always set, `resource_kind`/`resource_id` only
//! for resource-pinned tokens.

use super::TokenStore;
use crate::errors::{AppError, AppResult};
use crate::models::{AccessToken, ResourceKind, TokenScope};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// SQLite token store
#[derive(Clone)]
pub struct SqliteTokenStore {
    pool: Pool<Sqlite>,
}

impl SqliteTokenStore {
    /// Open (creating if necessary) the database at `database_url` and run
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a database error if the connection or migration fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let is_memory = database_url.contains(":memory:");
        let connection_options = if database_url.starts_with("sqlite:") && !is_memory {
            // Ensure SQLite creates the database file if it doesn't exist
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // An in-memory SQLite database exists per connection; a single
        // long-lived connection keeps the schema (and the data) visible
        // across all calls. File-backed databases get a normal pool.
        let pool = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&connection_options)
                .await
        } else {
            SqlitePoolOptions::new().connect(&connection_options).await
        }
        .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the underlying pool for advanced operations
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the access token table and its indexes
    ///
    /// # Errors
    ///
    /// Returns a database error if a DDL statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS access_tokens (
                id TEXT PRIMARY KEY,
                owner_user_id TEXT NOT NULL,
                label TEXT NOT NULL,
                secret_hash TEXT NOT NULL UNIQUE,
                team_id TEXT NOT NULL,
                resource_kind TEXT,
                resource_id TEXT,
                created_at TIMESTAMP NOT NULL,
                expires_at TIMESTAMP,
                last_used_at TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create access_tokens table: {e}")))?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_access_tokens_owner
            ON access_tokens (owner_user_id, created_at DESC)
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create owner index: {e}")))?;

        Ok(())
    }

    /// Convert a database row to an [`AccessToken`]
    fn row_to_token(row: &SqliteRow) -> AppResult<AccessToken> {
        let team_id: String = row.get("team_id");
        let resource_kind: Option<String> = row.get("resource_kind");
        let resource_id: Option<String> = row.get("resource_id");

        let scope = match (resource_kind, resource_id) {
            (Some(kind), Some(resource_id)) => TokenScope::TeamResource {
                team_id,
                resource_kind: kind.parse::<ResourceKind>()?,
                resource_id,
            },
            (None, None) => TokenScope::Team { team_id },
            _ => {
                return Err(AppError::internal(
                    "access token row has a partial resource scope",
                ))
            }
        };

        Ok(AccessToken {
            id: row.get("id"),
            owner_user_id: Uuid::parse_str(row.get::<String, _>("owner_user_id").as_str())
                .map_err(|e| {
                    AppError::internal(format!("Failed to parse owner_user_id UUID: {e}"))
                })?,
            label: row.get("label"),
            secret_hash: row.get("secret_hash"),
            scope,
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            last_used_at: row.get("last_used_at"),
        })
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn create(&self, token: &AccessToken) -> AppResult<()> {
        let (resource_kind, resource_id) = match &token.scope {
            TokenScope::Team { .. } => (None, None),
            TokenScope::TeamResource {
                resource_kind,
                resource_id,
                ..
            } => (Some(resource_kind.as_str()), Some(resource_id.as_str())),
        };

        sqlx::query(
            r"
            INSERT INTO access_tokens (
                id, owner_user_id, label, secret_hash, team_id,
                resource_kind, resource_id, created_at, expires_at, last_used_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&token.id)
        .bind(token.owner_user_id.to_string())
        .bind(&token.label)
        .bind(&token.secret_hash)
        .bind(token.scope.team_id())
        .bind(resource_kind)
        .bind(resource_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                AppError::conflict("access token secret hash already exists")
            } else {
                AppError::database(format!("Failed to create access token: {e}"))
            }
        })?;

        Ok(())
    }

    async fn find_by_hash(&self, secret_hash: &str) -> AppResult<Option<AccessToken>> {
        let row = sqlx::query(
            r"
            SELECT * FROM access_tokens
            WHERE secret_hash = $1
            ",
        )
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up access token by hash: {e}")))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<AccessToken>> {
        let row = sqlx::query(
            r"
            SELECT * FROM access_tokens
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up access token by id: {e}")))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn list_by_owner(&self, owner_user_id: Uuid) -> AppResult<Vec<AccessToken>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM access_tokens
            WHERE owner_user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(owner_user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list access tokens: {e}")))?;

        rows.iter().map(Self::row_to_token).collect()
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM access_tokens
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete access token: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn rename(&self, id: &str, label: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE access_tokens
            SET label = $1
            WHERE id = $2
            ",
        )
        .bind(label)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to rename access token: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_used(&self, id: &str) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE access_tokens
            SET last_used_at = $1
            WHERE id = $2
            ",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update last-used timestamp: {e}")))?;

        Ok(())
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM access_tokens
            WHERE expires_at IS NOT NULL
            AND expires_at < $1
            ",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to sweep expired access tokens: {e}")))?;

        Ok(result.rows_affected())
    }
}
