// ABOUTME: Token codec - secret generation and external token string encode/decode
// ABOUTME: Produces prefix.id.secret strings and keyed hashes; never round-trips plaintext
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Token Codec
//!
//! Generates token secrets with 256 bits of entropy and encodes them as
//! `<prefix>.<token id>.<secret>`. The embedded id lets validation pre-filter
//! before comparing hashes. Hashing is HMAC-SHA256 keyed with a server-side
//! secret, so a leaked token table alone is not enough to forge credentials.
//!
//! The codec is side-effect free given its random source; it holds no
//! storage and performs no I/O.

use crate::errors::{AppError, AppResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a token secret (256 bits of entropy)
const SECRET_BYTES: usize = 32;

/// Base64url length of a 32-byte secret without padding
const MIN_SECRET_CHARS: usize = 43;

/// Typed parse failure; attacker-supplied garbage never panics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string does not have the expected prefix/structure
    #[error("malformed access token")]
    Malformed,
    /// Well-formed token carrying a recognized but retired prefix; rejected
    /// distinctly from malformed input so hash-scheme rotation stays
    /// observable in logs
    #[error("access token prefix `{0}` is no longer supported")]
    RetiredPrefix(String),
}

/// Structured identity recovered from an external token string
pub struct ParsedToken {
    /// Embedded token id, used as a pre-filter before hash comparison
    pub token_id: String,
    /// The plaintext secret; wiped from memory when dropped
    pub secret: Zeroizing<String>,
}

/// Result of minting a new secret
pub struct MintedSecret {
    /// Generated token id, embedded in the external string
    pub token_id: String,
    /// The full external token string (the only copy of the plaintext)
    pub external: String,
    /// Keyed hash of the secret, the value the store persists
    pub secret_hash: String,
}

/// Encodes and decodes external token strings
#[derive(Clone)]
pub struct TokenCodec {
    prefix: String,
    mac: HmacSha256,
    retired_prefixes: Vec<String>,
}

impl fmt::Debug for TokenCodec {
    // key material stays out of Debug output
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("prefix", &self.prefix)
            .field("retired_prefixes", &self.retired_prefixes)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec with the given external prefix and server-side hash key
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key cannot initialize the MAC
    pub fn new(prefix: impl Into<String>, hash_key: &[u8]) -> AppResult<Self> {
        let mac = HmacSha256::new_from_slice(hash_key)
            .map_err(|e| AppError::config(format!("invalid hash key: {e}")))?;
        Ok(Self {
            prefix: prefix.into(),
            mac,
            retired_prefixes: Vec::new(),
        })
    }

    /// Register prefixes from retired hash schemes. Tokens carrying one are
    /// rejected with [`ParseError::RetiredPrefix`] instead of `Malformed`.
    #[must_use]
    pub fn with_retired_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.retired_prefixes = prefixes.into_iter().collect();
        self
    }

    /// The external prefix this codec emits
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a fresh secret and its external encoding
    #[must_use]
    pub fn mint(&self) -> MintedSecret {
        let token_id = uuid::Uuid::new_v4().simple().to_string();

        let mut secret_bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut secret_bytes);
        let secret = URL_SAFE_NO_PAD.encode(&secret_bytes);
        secret_bytes.zeroize();

        let secret_hash = self.hash_secret(&secret);
        let external = format!("{}.{}.{}", self.prefix, token_id, secret);

        MintedSecret {
            token_id,
            external,
            secret_hash,
        }
    }

    /// Recover structured identity from a presented token string
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] for structurally invalid input and
    /// [`ParseError::RetiredPrefix`] for tokens from a retired hash scheme
    pub fn parse(&self, presented: &str) -> Result<ParsedToken, ParseError> {
        let parts: Vec<&str> = presented.split('.').collect();
        let (prefix, token_id, secret) = match parts.as_slice() {
            [prefix, token_id, secret] => (*prefix, *token_id, *secret),
            _ => return Err(ParseError::Malformed),
        };

        if token_id.is_empty() || !token_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseError::Malformed);
        }
        if secret.len() < MIN_SECRET_CHARS
            || !secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ParseError::Malformed);
        }

        if prefix != self.prefix {
            if self.retired_prefixes.iter().any(|p| p == prefix) {
                return Err(ParseError::RetiredPrefix(prefix.to_owned()));
            }
            return Err(ParseError::Malformed);
        }

        Ok(ParsedToken {
            token_id: token_id.to_owned(),
            secret: Zeroizing::new(secret.to_owned()),
        })
    }

    /// Keyed hash of a token secret, hex-encoded
    #[must_use]
    pub fn hash_secret(&self, secret: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(secret.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of two hex hash strings
    #[must_use]
    pub fn hashes_match(a: &str, b: &str) -> bool {
        a.as_bytes().ct_eq(b.as_bytes()).into()
    }
}
