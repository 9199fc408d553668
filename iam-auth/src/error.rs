//! Error types for credential operations
//!
//! This module defines all error types that can occur while minting,
//! validating and renewing tokens, and while hashing passwords.

use thiserror::Error;

/// Authentication error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// JWT token has expired
    #[error("Token has expired")]
    TokenExpired,

    /// JWT token is invalid (malformed, bad signature, wrong kind, etc.)
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Signing a token failed
    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    /// No usable credential was presented
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Expired or forged tokens are expected traffic and are not.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::TokenCreation(_) | AuthError::PasswordHash(_) | AuthError::ConfigError(_)
        )
    }

    /// Whether the caller should retry with a refresh token rather than
    /// logging in again.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, AuthError::TokenExpired)
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::TokenCreation(_) => "TOKEN_CREATION_ERROR",
            AuthError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthError::PasswordHash(_) => "PASSWORD_HASH_ERROR",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_needs_refresh() {
        assert!(AuthError::TokenExpired.needs_refresh());
        assert!(!AuthError::InvalidToken("sig".into()).needs_refresh());
    }

    #[test]
    fn test_server_errors() {
        assert!(AuthError::TokenCreation("x".into()).is_server_error());
        assert!(!AuthError::TokenExpired.is_server_error());
        assert_eq!(AuthError::TokenCreation("x".into()).error_code(), "TOKEN_CREATION_ERROR");
    }
}
