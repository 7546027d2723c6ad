// ABOUTME: Access token data model and the DTOs crossing the service boundary
// ABOUTME: Token record, scope variants, creation request, and hash-free outward views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Access Token Data Model
//!
//! [`AccessToken`] is the record owned by the store. Everything handed
//! outward goes through [`AccessTokenInfo`], which never carries the secret
//! hash.

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of team resource a token can be pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A team collection
    Collection,
    /// A team environment
    Environment,
}

impl ResourceKind {
    /// Stable string form used for persistence
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Environment => "environment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collection" => Ok(Self::Collection),
            "environment" => Ok(Self::Environment),
            other => Err(AppError::internal(format!(
                "unknown resource kind `{other}`"
            ))),
        }
    }
}

/// What a token is authorized to act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TokenScope {
    /// The whole team, bounded by whatever the owner can reach
    Team {
        /// Team the token is bound to
        team_id: String,
    },
    /// A single collection or environment within a team
    TeamResource {
        /// Team the token is bound to
        team_id: String,
        /// Kind of the pinned resource
        resource_kind: ResourceKind,
        /// Identifier of the pinned resource
        resource_id: String,
    },
}

impl TokenScope {
    /// Team the scope is bound to, regardless of variant
    #[must_use]
    pub fn team_id(&self) -> &str {
        match self {
            Self::Team { team_id } | Self::TeamResource { team_id, .. } => team_id,
        }
    }
}

/// Personal access token record, owned by the store
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Unique token ID, embedded in the external token string
    pub id: String,
    /// Owner user ID
    pub owner_user_id: Uuid,
    /// Human-readable label, mutable, not security-relevant
    pub label: String,
    /// Keyed hash of the token secret; the plaintext is never stored
    pub secret_hash: String,
    /// Scope the token is authorized for
    pub scope: TokenScope,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Optional expiration; `None` means the token must be explicitly revoked
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful validation, updated best-effort
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Lazy expiry check against the given instant
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Outward representation of a token (listing, mint response, validation
/// result). Excludes the secret hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenInfo {
    /// Unique token ID
    pub id: String,
    /// Owner user ID; the effective acting user for authenticated requests
    pub owner_user_id: Uuid,
    /// Human-readable label
    pub label: String,
    /// Scope the token is authorized for
    pub scope: TokenScope,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Optional expiration timestamp
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful validation
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<AccessToken> for AccessTokenInfo {
    fn from(token: AccessToken) -> Self {
        Self {
            id: token.id,
            owner_user_id: token.owner_user_id,
            label: token.label,
            scope: token.scope,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

/// Request to mint a new access token
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccessTokenRequest {
    /// Human-readable label for the token
    pub label: String,
    /// Scope the token should be bound to
    pub scope: TokenScope,
    /// Days until expiration (`None` for never expires)
    pub expires_in_days: Option<i64>,
}

/// Response when minting a token; the only place the token value appears
#[derive(Debug, Clone, Serialize)]
pub struct MintedAccessToken {
    /// Token metadata
    pub token: AccessTokenInfo,
    /// The external token string, returned exactly once at creation
    pub token_value: String,
}
