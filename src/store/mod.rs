// ABOUTME: Token store abstraction - durable CRUD over access token records
// ABOUTME: Trait keyed for the two access patterns: by owner (listing) and by hash (validation)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Token Store
//!
//! Persistence abstraction for [`AccessToken`] records. Implementations must
//! enforce secret-hash uniqueness as a hard constraint and keep delete and
//! lookup in one consistency domain: a revoke must be observable by the very
//! next validation.

/// SQLite-backed store implementation
pub mod sqlite;

pub use sqlite::SqliteTokenStore;

use crate::errors::AppResult;
use crate::models::AccessToken;
use async_trait::async_trait;
use uuid::Uuid;

/// Durable, transactional CRUD over access token records
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new token record.
    ///
    /// # Errors
    ///
    /// Returns a conflict error (`ResourceAlreadyExists`) when the secret
    /// hash collides with a live record; the service treats that as a
    /// generation retry, never a user-visible failure. Any other error is an
    /// infrastructure failure.
    async fn create(&self, token: &AccessToken) -> AppResult<()>;

    /// Look up a token by its secret hash. Absence is `Ok(None)`, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn find_by_hash(&self, secret_hash: &str) -> AppResult<Option<AccessToken>>;

    /// Look up a token by id.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<AccessToken>>;

    /// All tokens owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn list_by_owner(&self, owner_user_id: Uuid) -> AppResult<Vec<AccessToken>>;

    /// Remove a token record. Returns `false` when no such record existed.
    /// Requester authorization is the service's concern.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn delete(&self, id: &str) -> AppResult<bool>;

    /// Change a token's label. Returns `false` when no such record existed.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn rename(&self, id: &str, label: &str) -> AppResult<bool>;

    /// Record a successful validation. Best-effort: callers fire and forget,
    /// and a failure here must never fail the request it was attached to.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn touch_last_used(&self, id: &str) -> AppResult<()>;

    /// Remove every expired token, returning how many were swept. Lazy
    /// validation-time expiry stays the correctness mechanism; this is a
    /// maintenance optimization.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    async fn delete_expired(&self) -> AppResult<u64>;
}
