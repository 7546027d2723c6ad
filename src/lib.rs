// ABOUTME: Library entry point for the personal access token lifecycle engine
// ABOUTME: Minting, scoped validation, listing, and revocation of team-bound tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

#![deny(unsafe_code)]

//! # Personal Access Token Engine
//!
//! Issues, validates, and revokes long-lived personal access tokens that let
//! automated clients act on behalf of a user within that user's team
//! memberships.
//!
//! ## Architecture
//!
//! - **Codec** generates secrets and encodes/decodes the external
//!   `<prefix>.<id>.<secret>` token string.
//! - **Store** is the persistence abstraction, keyed for lookup by secret
//!   hash (validation) and by owner (listing).
//! - **Scope resolver** decides whether a token may perform a requested
//!   operation, consulting the injected team-membership and
//!   resource-permission subsystems.
//! - **Service** orchestrates the lifecycle and owns its invariants.
//!
//! Collaborators are wired by constructor injection; the crate has no
//! runtime container and no transport layer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pat_engine::codec::TokenCodec;
//! use pat_engine::config::AccessTokenConfig;
//! use pat_engine::errors::AppResult;
//! use pat_engine::scope::{ResourceAccess, ScopeResolver, TeamMembership};
//! use pat_engine::service::AccessTokenService;
//! use pat_engine::store::SqliteTokenStore;
//!
//! async fn build(
//!     teams: Arc<dyn TeamMembership>,
//!     resources: Arc<dyn ResourceAccess>,
//! ) -> AppResult<AccessTokenService> {
//!     let config = AccessTokenConfig::from_env()?;
//!     let store = Arc::new(SqliteTokenStore::new("sqlite:data/tokens.db").await?);
//!     let codec = TokenCodec::new(&config.token_prefix, &config.hash_key)?;
//!     let resolver = ScopeResolver::new(Arc::clone(&teams), resources);
//!     Ok(AccessTokenService::new(store, codec, resolver, teams, &config))
//! }
//! ```

/// Token codec: secret generation and external string encode/decode
pub mod codec;

/// Environment-driven engine configuration
pub mod config;

/// Unified error handling and the sanitized public boundary
pub mod errors;

/// Access token data model and boundary DTOs
pub mod models;

/// Scope resolution against injected membership/permission capabilities
pub mod scope;

/// Lifecycle orchestration: mint, validate, list, rename, revoke, sweep
pub mod service;

/// Token persistence abstraction and the SQLite implementation
pub mod store;
