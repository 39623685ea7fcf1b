// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for idlemon-core.
//!
//! Business-rule rejections (quest already completed, requirements not met,
//! insufficient funds, ...) are *not* errors; they are returned as typed outcome
//! enums from the service. The types here cover malformed input, conflicts,
//! rejected credentials, and infrastructure failures.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::token::TokenError;

/// Result type using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to callers for every infrastructure failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "internal server error";

/// Errors surfaced by [`GameService`](crate::service::GameService) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input failed validation. The message is safe to show to the caller.
    #[error("Validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// A uniqueness constraint rejected the request (duplicate name or email).
    #[error("{0}")]
    Conflict(String),

    /// The credential was missing, malformed, expired, or forged.
    #[error("unauthorized")]
    Unauthorized,

    /// Player state store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Token cache failure.
    #[error("Token cache error: {0}")]
    Cache(#[from] TokenError),

    /// Credential hashing or verification failed for a reason other than a mismatch.
    #[error("Credential error: {0}")]
    Credential(String),
}

impl Error {
    /// Shorthand for building a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Store(_) | Self::Cache(_) | Self::Credential(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is an infrastructure failure whose details must not leak.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Cache(_) | Self::Credential(_))
    }

    /// Message that may be shown to the caller.
    ///
    /// Validation and conflict messages are returned verbatim; unauthorized is
    /// generic; infrastructure failures collapse to [`GENERIC_FAILURE_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { field, message } => format!("{}: {}", field, message),
            Self::Conflict(message) => message.clone(),
            Self::Unauthorized => "unauthorized".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Convert this error to a caller-facing response body.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
        }
    }
}

/// Caller-facing error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Stable machine-readable error code.
    pub code: String,
    /// Sanitized message.
    pub message: String,
}

/// Failures of the player state store.
///
/// Any of these means the transaction was abandoned and the player's previously
/// committed state is still authoritative.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No row exists for the player.
    #[error("Player '{0}' not found")]
    PlayerNotFound(Uuid),

    /// The conditional write matched no row at the locked version.
    #[error("Version conflict for player '{player_id}': expected version {expected}")]
    VersionConflict {
        /// The player being updated.
        player_id: Uuid,
        /// The version read under the lock.
        expected: i64,
    },

    /// Commit or rollback was requested twice on the same locked handle.
    #[error("Transaction for player '{0}' is already closed")]
    TransactionClosed(Uuid),

    /// The locked update did not finish in time and was rolled back.
    #[error("Locked update timed out after {0:?}")]
    Timeout(Duration),

    /// Database operation failed.
    #[error("Database error during '{operation}': {details}")]
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Database {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database {
            operation: "migrate".to_string(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (Error::validation("name", "too short"), "VALIDATION_ERROR"),
            (
                Error::Conflict("name is already taken".to_string()),
                "CONFLICT",
            ),
            (Error::Unauthorized, "UNAUTHORIZED"),
            (
                Error::Store(StoreError::PlayerNotFound(Uuid::nil())),
                "INTERNAL_ERROR",
            ),
            (
                Error::Cache(TokenError::Cache("connection refused".to_string())),
                "INTERNAL_ERROR",
            ),
            (Error::Credential("bad hash".to_string()), "INTERNAL_ERROR"),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
        }
    }

    #[test]
    fn test_internal_errors_are_sanitized() {
        let err = Error::Store(StoreError::Database {
            operation: "commit".to_string(),
            details: "connection to 10.0.0.5:5432 reset".to_string(),
        });

        assert!(err.is_internal());
        let response = err.to_response();
        assert_eq!(response.code, "INTERNAL_ERROR");
        assert_eq!(response.message, GENERIC_FAILURE_MESSAGE);
        assert!(!response.message.contains("10.0.0.5"));

        // The full detail is still available for logging.
        assert!(err.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn test_caller_errors_are_verbatim() {
        let err = Error::validation("name", "must be between 3 and 16 characters");
        assert!(!err.is_internal());
        assert_eq!(
            err.public_message(),
            "name: must be between 3 and 16 characters"
        );

        let err = Error::Conflict("an account with this email already exists".to_string());
        assert_eq!(
            err.public_message(),
            "an account with this email already exists"
        );

        assert_eq!(Error::Unauthorized.public_message(), "unauthorized");
    }

    #[test]
    fn test_store_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            StoreError::PlayerNotFound(id).to_string(),
            "Player '00000000-0000-0000-0000-000000000000' not found"
        );

        let err = StoreError::VersionConflict {
            player_id: id,
            expected: 7,
        };
        assert_eq!(
            err.to_string(),
            "Version conflict for player '00000000-0000-0000-0000-000000000000': expected version 7"
        );

        let err = StoreError::Database {
            operation: "insert".to_string(),
            details: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database error during 'insert': connection refused"
        );
    }

    #[test]
    fn test_store_error_converts_into_error() {
        let err: Error = StoreError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, Error::Store(StoreError::Timeout(_))));
        assert!(err.is_internal());
    }
}
