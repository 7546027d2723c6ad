// ABOUTME: Access token service - sole owner of the token lifecycle invariants
// ABOUTME: Orchestrates minting, validation, listing, renaming, revocation, and expiry sweeps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Access Token Service
//!
//! Orchestrates the codec, store, and scope resolver behind the lifecycle
//! contract: mint, validate, list, rename, revoke, sweep. Collaborators are
//! injected through the constructor; there is no runtime container.
//!
//! Validation failures of the authentication class (unknown, expired,
//! revoked membership, scope denial) are externally indistinguishable. The
//! specific reason is logged before the error is sanitized.

use crate::codec::{ParseError, TokenCodec};
use crate::config::AccessTokenConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{
    AccessToken, AccessTokenInfo, CreateAccessTokenRequest, MintedAccessToken, TokenScope,
};
use crate::scope::{Authorization, RequestedAccess, ScopeResolver, TeamMembership};
use crate::store::TokenStore;
use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Access token lifecycle service
#[derive(Clone)]
pub struct AccessTokenService {
    store: Arc<dyn TokenStore>,
    codec: TokenCodec,
    resolver: ScopeResolver,
    teams: Arc<dyn TeamMembership>,
    mint_max_attempts: u32,
    store_timeout: StdDuration,
}

impl AccessTokenService {
    /// Create the service over its four collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        codec: TokenCodec,
        resolver: ScopeResolver,
        teams: Arc<dyn TeamMembership>,
        config: &AccessTokenConfig,
    ) -> Self {
        Self {
            store,
            codec,
            resolver,
            teams,
            mint_max_attempts: config.mint_max_attempts,
            store_timeout: config.store_timeout,
        }
    }

    /// Mint a new access token bound to the requested scope.
    ///
    /// The owner must currently belong to the scope's team. A secret-hash
    /// collision from the store is retried with a fresh secret up to the
    /// configured bound.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the label, scope, or TTL fails validation
    /// - `PermissionDenied` when the owner is not a member of the team
    /// - `KeyGenerationExhausted` when every retry collided (alert-worthy)
    /// - infrastructure errors from the store or membership collaborator
    pub async fn mint(
        &self,
        owner_user_id: Uuid,
        request: CreateAccessTokenRequest,
    ) -> AppResult<MintedAccessToken> {
        Self::validate_request(&request)?;

        let team_id = request.scope.team_id();
        if !self.teams.is_member(owner_user_id, team_id).await? {
            return Err(AppError::permission_denied(
                "user is not a member of the target team",
            ));
        }

        let now = Utc::now();
        let expires_at = request.expires_in_days.map(|days| now + Duration::days(days));

        for attempt in 1..=self.mint_max_attempts {
            let minted = self.codec.mint();
            let token = AccessToken {
                id: minted.token_id,
                owner_user_id,
                label: request.label.clone(),
                secret_hash: minted.secret_hash,
                scope: request.scope.clone(),
                created_at: now,
                expires_at,
                last_used_at: None,
            };

            match self
                .with_store_timeout("create", self.store.create(&token))
                .await
            {
                Ok(()) => {
                    info!(
                        token_id = %token.id,
                        owner_user_id = %owner_user_id,
                        team_id = %team_id,
                        "minted access token"
                    );
                    return Ok(MintedAccessToken {
                        token: token.into(),
                        token_value: minted.external,
                    });
                }
                Err(e) if e.code == ErrorCode::ResourceAlreadyExists => {
                    // negligible with 256-bit secrets, but the store enforces
                    // hash uniqueness as a hard constraint and we retry
                    warn!(attempt, "secret hash collision on mint, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            attempts = self.mint_max_attempts,
            "access token generation exhausted"
        );
        Err(AppError::generation_exhausted(self.mint_max_attempts))
    }

    /// Validate a presented token string against the requested access and
    /// return the token's outward representation on success.
    ///
    /// On success the last-used timestamp is updated asynchronously; that
    /// write is best-effort and never delays or fails the request.
    ///
    /// # Errors
    ///
    /// - `AuthMalformed` when the string is structurally invalid
    /// - `AuthInvalid` for every authentication/authorization failure,
    ///   deliberately indistinguishable across unknown, expired, and revoked
    ///   tokens
    /// - `Timeout`/`DatabaseError` infrastructure failures, retryable by the
    ///   caller
    pub async fn validate(
        &self,
        presented: &str,
        requested: &RequestedAccess,
    ) -> AppResult<AccessTokenInfo> {
        let parsed = match self.codec.parse(presented) {
            Ok(parsed) => parsed,
            Err(ParseError::Malformed) => {
                return Err(AppError::auth_malformed("malformed access token"));
            }
            Err(ParseError::RetiredPrefix(prefix)) => {
                debug!(prefix = %prefix, "rejected token from retired prefix");
                return Err(AppError::invalid_token());
            }
        };

        let secret_hash = self.codec.hash_secret(&parsed.secret);
        let record = self
            .with_store_timeout("find_by_hash", self.store.find_by_hash(&secret_hash))
            .await?;

        let Some(record) = record else {
            debug!(token_id = %parsed.token_id, "access token not found");
            return Err(AppError::invalid_token());
        };

        // a valid secret spliced onto a foreign id fails closed
        if record.id != parsed.token_id {
            debug!(token_id = %parsed.token_id, "embedded token id does not match record");
            return Err(AppError::invalid_token());
        }

        if !TokenCodec::hashes_match(&secret_hash, &record.secret_hash) {
            debug!(token_id = %record.id, "secret hash comparison failed");
            return Err(AppError::invalid_token());
        }

        if record.is_expired(Utc::now()) {
            debug!(token_id = %record.id, "access token expired");
            return Err(AppError::auth_expired("access token expired").sanitized());
        }

        match self.resolver.authorize(&record, requested).await? {
            Authorization::Granted => {}
            Authorization::Denied(reason) => {
                warn!(
                    token_id = %record.id,
                    team_id = %requested.team_id,
                    reason = %reason,
                    "access token denied"
                );
                return Err(AppError::invalid_token());
            }
        }

        let store = Arc::clone(&self.store);
        let token_id = record.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_used(&token_id).await {
                warn!(token_id = %token_id, error = %e, "failed to update last-used timestamp");
            }
        });

        Ok(record.into())
    }

    /// List the tokens a user owns, newest first. The secret hash never
    /// appears in the result.
    ///
    /// # Errors
    ///
    /// Returns infrastructure errors from the store.
    pub async fn list(&self, owner_user_id: Uuid) -> AppResult<Vec<AccessTokenInfo>> {
        let tokens = self
            .with_store_timeout("list_by_owner", self.store.list_by_owner(owner_user_id))
            .await?;
        Ok(tokens.into_iter().map(AccessTokenInfo::from).collect())
    }

    /// Revoke a token. Permitted for the token's owner and for admins of the
    /// token's scope team. Revocation is immediately observable: the next
    /// validation of the token fails.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when no such token exists
    /// - `PermissionDenied` when the requester is neither owner nor team
    ///   admin
    /// - infrastructure errors from the store or membership collaborator
    pub async fn revoke(&self, token_id: &str, requester_user_id: Uuid) -> AppResult<()> {
        let record = self
            .with_store_timeout("find_by_id", self.store.find_by_id(token_id))
            .await?
            .ok_or_else(|| AppError::not_found("Access token"))?;

        let permitted = record.owner_user_id == requester_user_id
            || self
                .teams
                .is_admin(requester_user_id, record.scope.team_id())
                .await?;
        if !permitted {
            return Err(AppError::permission_denied(
                "only the token owner or a team admin may revoke an access token",
            ));
        }

        let deleted = self
            .with_store_timeout("delete", self.store.delete(token_id))
            .await?;
        if !deleted {
            // raced with another revoke
            return Err(AppError::not_found("Access token"));
        }

        info!(
            token_id = %token_id,
            requester_user_id = %requester_user_id,
            "revoked access token"
        );
        Ok(())
    }

    /// Change a token's label. Owner-only; the label is not
    /// security-relevant but still belongs to its owner.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the new label is empty
    /// - `ResourceNotFound` when no such token exists
    /// - `PermissionDenied` when the requester does not own the token
    /// - infrastructure errors from the store
    pub async fn rename(
        &self,
        token_id: &str,
        requester_user_id: Uuid,
        new_label: &str,
    ) -> AppResult<()> {
        if new_label.trim().is_empty() {
            return Err(AppError::invalid_input("token label must not be empty"));
        }

        let record = self
            .with_store_timeout("find_by_id", self.store.find_by_id(token_id))
            .await?
            .ok_or_else(|| AppError::not_found("Access token"))?;

        if record.owner_user_id != requester_user_id {
            return Err(AppError::permission_denied(
                "only the token owner may rename an access token",
            ));
        }

        let renamed = self
            .with_store_timeout("rename", self.store.rename(token_id, new_label))
            .await?;
        if !renamed {
            return Err(AppError::not_found("Access token"));
        }
        Ok(())
    }

    /// Remove every expired token. Lazy validation-time expiry is already
    /// sufficient for correctness; this trims dead rows.
    ///
    /// # Errors
    ///
    /// Returns infrastructure errors from the store.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let swept = self.store.delete_expired().await?;
        if swept > 0 {
            info!(swept, "swept expired access tokens");
        }
        Ok(swept)
    }

    /// Reject structurally invalid mint requests before touching any
    /// collaborator
    fn validate_request(request: &CreateAccessTokenRequest) -> AppResult<()> {
        if request.label.trim().is_empty() {
            return Err(AppError::invalid_input("token label must not be empty"));
        }
        if request.scope.team_id().is_empty() {
            return Err(AppError::invalid_input("scope team id must not be empty"));
        }
        if let TokenScope::TeamResource { resource_id, .. } = &request.scope {
            if resource_id.is_empty() {
                return Err(AppError::invalid_input(
                    "scope resource id must not be empty",
                ));
            }
        }
        if let Some(days) = request.expires_in_days {
            if days <= 0 {
                return Err(AppError::invalid_input(
                    "token expiry must be at least one day",
                ));
            }
        }
        Ok(())
    }

    /// Apply the configured deadline to a store call made on the request
    /// path; an elapsed deadline surfaces as a retryable infrastructure
    /// error, never an authorization failure
    async fn with_store_timeout<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(operation)),
        }
    }
}
