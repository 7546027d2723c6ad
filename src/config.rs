// ABOUTME: Environment-driven configuration for the access token engine
// ABOUTME: Token prefix, server-side hash key, mint retry bound, and store timeout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Engine Configuration
//!
//! Environment-only configuration, validated on load. The hash key is
//! server-side secret material and is required; everything else has a
//! sensible default.

use crate::errors::{AppError, AppResult};
use std::env;
use std::time::Duration;

/// Default external token prefix
pub const DEFAULT_TOKEN_PREFIX: &str = "pat";

/// Default bound on mint retries after a secret-hash collision
pub const DEFAULT_MINT_MAX_ATTEMPTS: u32 = 5;

/// Default per-call deadline for store operations on the request path
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Minimum accepted HMAC key length in bytes
const MIN_HASH_KEY_BYTES: usize = 32;

/// Configuration for the token engine
#[derive(Debug, Clone)]
pub struct AccessTokenConfig {
    /// Prefix of the external token string; versioned, changing the hash
    /// scheme requires a new prefix
    pub token_prefix: String,
    /// Server-side HMAC key for secret hashing (raw bytes)
    pub hash_key: Vec<u8>,
    /// Bounded retries when the store reports a secret-hash collision
    pub mint_max_attempts: u32,
    /// Deadline applied to each store call made on the request path
    pub store_timeout: Duration,
}

impl AccessTokenConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PAT_HASH_KEY` (required): hex-encoded key, at least 32 bytes.
    /// - `PAT_TOKEN_PREFIX` (default `pat`)
    /// - `PAT_MINT_MAX_ATTEMPTS` (default 5)
    /// - `PAT_STORE_TIMEOUT_MS` (default 5000)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the hash key is missing or invalid,
    /// or if any variable fails to parse or validate.
    pub fn from_env() -> AppResult<Self> {
        let hash_key_hex = env::var("PAT_HASH_KEY")
            .map_err(|_| AppError::config("PAT_HASH_KEY environment variable is required"))?;
        let hash_key = hex::decode(hash_key_hex.trim())
            .map_err(|e| AppError::config(format!("PAT_HASH_KEY is not valid hex: {e}")))?;

        let token_prefix =
            env::var("PAT_TOKEN_PREFIX").unwrap_or_else(|_| DEFAULT_TOKEN_PREFIX.into());

        let mint_max_attempts = match env::var("PAT_MINT_MAX_ATTEMPTS") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                AppError::config(format!("PAT_MINT_MAX_ATTEMPTS is not a number: {e}"))
            })?,
            Err(_) => DEFAULT_MINT_MAX_ATTEMPTS,
        };

        let store_timeout_ms = match env::var("PAT_STORE_TIMEOUT_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::config(format!("PAT_STORE_TIMEOUT_MS is not a number: {e}"))
            })?,
            Err(_) => DEFAULT_STORE_TIMEOUT_MS,
        };

        let config = Self {
            token_prefix,
            hash_key,
            mint_max_attempts,
            store_timeout: Duration::from_millis(store_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first violated invariant.
    pub fn validate(&self) -> AppResult<()> {
        if self.hash_key.len() < MIN_HASH_KEY_BYTES {
            return Err(AppError::config(format!(
                "hash key must be at least {MIN_HASH_KEY_BYTES} bytes, got {}",
                self.hash_key.len()
            )));
        }
        if self.token_prefix.is_empty()
            || !self
                .token_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AppError::config(
                "token prefix must be non-empty and alphanumeric",
            ));
        }
        if self.mint_max_attempts == 0 {
            return Err(AppError::config("mint retry bound must be at least 1"));
        }
        if self.store_timeout.is_zero() {
            return Err(AppError::config("store timeout must be non-zero"));
        }
        Ok(())
    }
}
