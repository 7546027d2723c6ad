// ABOUTME: Unified error handling for the access token engine
// ABOUTME: Defines error codes, the AppError type, and the sanitized public boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Unified Error Handling
//!
//! Centralized error types for the token lifecycle engine. Every fallible
//! operation returns [`AppResult`]. The taxonomy distinguishes client errors,
//! authentication/authorization failures, and retryable infrastructure
//! failures; [`AppError::sanitized`] collapses the auth class into a single
//! indistinguishable failure for external callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message carried by every sanitized authentication failure. Deliberately
/// identical for unknown, expired, and revoked tokens so that callers cannot
/// enumerate which tokens exist.
pub const GENERIC_AUTH_FAILURE: &str = "invalid or unauthorized access token";

/// Standard error codes used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    /// Credential failed authentication or authorization
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    /// Credential has expired (internal only, sanitized at the boundary)
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,
    /// Presented token string is structurally invalid
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1003,
    /// Requester lacks permission for the operation
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied = 1004,

    // Validation (3000-3999)
    /// Request payload failed validation
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Resource Management (4000-4999)
    /// Requested resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    /// Uniqueness constraint violated (secret hash collision)
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists = 4001,

    // Configuration (6000-6999)
    /// Configuration is missing or invalid
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Storage backend operation failed
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// Storage backend call exceeded its deadline (retryable)
    #[serde(rename = "TIMEOUT")]
    Timeout = 9002,
    /// Bounded secret-generation retries exhausted (alert-worthy)
    #[serde(rename = "KEY_GENERATION_EXHAUSTED")]
    KeyGenerationExhausted = 9003,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::AuthMalformed | Self::InvalidInput => 400,
            Self::AuthInvalid | Self::AuthExpired => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists => 409,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::KeyGenerationExhausted => 500,
            Self::Timeout => 503,
        }
    }

    /// Whether a caller may meaningfully retry the failed operation
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::DatabaseError)
    }

    /// Get a user-facing description of this error
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::AuthInvalid => "The provided credentials are invalid",
            Self::AuthExpired => "The credential has expired",
            Self::AuthMalformed => "The credential is malformed",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Storage operation failed",
            Self::Timeout => "Storage operation timed out",
            Self::KeyGenerationExhausted => "Token generation retries exhausted",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Unified error type for the engine
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Collapse authentication/authorization failures into the single
    /// externally observable failure, leaving every other class untouched.
    /// Callers log the specific reason before sanitizing.
    #[must_use]
    pub fn sanitized(self) -> Self {
        match self.code {
            ErrorCode::AuthInvalid
            | ErrorCode::AuthExpired
            | ErrorCode::PermissionDenied
            | ErrorCode::ResourceNotFound => Self::invalid_token(),
            _ => self,
        }
    }

    /// The canonical sanitized authentication failure
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::new(ErrorCode::AuthInvalid, GENERIC_AUTH_FAILURE)
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Credential has expired
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExpired, message)
    }

    /// Malformed credential
    pub fn auth_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthMalformed, message)
    }

    /// Requester lacks permission
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Uniqueness conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Storage deadline exceeded
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("storage operation `{}` timed out", operation.into()),
        )
    }

    /// Bounded mint retries exhausted
    #[must_use]
    pub fn generation_exhausted(attempts: u32) -> Self {
        Self::new(
            ErrorCode::KeyGenerationExhausted,
            format!("failed to generate a unique token secret after {attempts} attempts"),
        )
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format for the request-handling layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Error payload carried by [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthInvalid.http_status(), 401);
        assert_eq!(ErrorCode::AuthMalformed.http_status(), 400);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ResourceAlreadyExists.http_status(), 409);
        assert_eq!(ErrorCode::Timeout.http_status(), 503);
        assert_eq!(ErrorCode::KeyGenerationExhausted.http_status(), 500);
    }

    #[test]
    fn test_sanitized_collapses_auth_failures() {
        let cases = [
            AppError::auth_expired("token expired three days ago"),
            AppError::not_found("Access token"),
            AppError::permission_denied("scope mismatch"),
            AppError::auth_invalid("unknown token"),
        ];
        for err in cases {
            let sanitized = err.sanitized();
            assert_eq!(sanitized.code, ErrorCode::AuthInvalid);
            assert_eq!(sanitized.message, GENERIC_AUTH_FAILURE);
        }
    }

    #[test]
    fn test_sanitized_leaves_other_classes() {
        let err = AppError::timeout("find_by_hash").sanitized();
        assert_eq!(err.code, ErrorCode::Timeout);

        let err = AppError::auth_malformed("not a token").sanitized();
        assert_eq!(err.code, ErrorCode::AuthMalformed);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::from(AppError::invalid_token());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("AUTH_INVALID"));
        assert!(json.contains(GENERIC_AUTH_FAILURE));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::DatabaseError.is_retryable());
        assert!(!ErrorCode::AuthInvalid.is_retryable());
        assert!(!ErrorCode::KeyGenerationExhausted.is_retryable());
    }
}
