//! Façade errors and the reasons reported to callers.

use iam_auth::AuthError;
use iam_events::EventBusError;
use iam_rbac::AuthzError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::mailer::MailError;
use crate::store::StoreError;

/// Typed failure reason carried by every unsuccessful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    InvalidParameters,
    Unauthenticated,
    PermissionDenied,
    AccountNotFound,
    AccountDisabled,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    TooManyAttempts,
    VerificationTokenMismatch,
    TokenCreationError,
    AlreadyExists,
    NotFound,
    Internal,
}

/// Errors surfaced by the identity service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Too many login attempts, retry in {retry_after}s")]
    TooManyAttempts {
        /// Seconds until the ban window closes
        retry_after: i64,
    },

    #[error("Verification token does not match")]
    VerificationTokenMismatch,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Infrastructure failure; the detail is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for façade operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Reason reported to the caller.
    pub fn reason(&self) -> ErrorReason {
        match self {
            ServiceError::InvalidParameters(_) => ErrorReason::InvalidParameters,
            ServiceError::Unauthenticated(_) => ErrorReason::Unauthenticated,
            ServiceError::PermissionDenied(_) => ErrorReason::PermissionDenied,
            ServiceError::AccountNotFound => ErrorReason::AccountNotFound,
            ServiceError::AccountDisabled => ErrorReason::AccountDisabled,
            ServiceError::InvalidCredentials => ErrorReason::InvalidCredentials,
            ServiceError::InvalidToken(_) => ErrorReason::InvalidToken,
            ServiceError::TokenExpired => ErrorReason::TokenExpired,
            ServiceError::TooManyAttempts { .. } => ErrorReason::TooManyAttempts,
            ServiceError::VerificationTokenMismatch => ErrorReason::VerificationTokenMismatch,
            ServiceError::TokenCreation(_) => ErrorReason::TokenCreationError,
            ServiceError::AlreadyExists(_) => ErrorReason::AlreadyExists,
            ServiceError::NotFound(_) => ErrorReason::NotFound,
            ServiceError::Internal(_) => ErrorReason::Internal,
        }
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServiceError::Internal(_) | ServiceError::TokenCreation(_))
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "Internal error".to_string(),
            ServiceError::TokenCreation(_) => "Could not issue tokens".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => ServiceError::TokenExpired,
            AuthError::InvalidToken(msg) => ServiceError::InvalidToken(msg),
            AuthError::TokenCreation(msg) => ServiceError::TokenCreation(msg),
            AuthError::Unauthenticated(msg) => ServiceError::Unauthenticated(msg),
            AuthError::PasswordHash(_) | AuthError::ConfigError(_) => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => {
                ServiceError::Unauthenticated("no resolvable role assignment".to_string())
            }
            AuthzError::PermissionDenied { operation, .. } => {
                ServiceError::PermissionDenied(format!("operation {} not allowed", operation))
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table } => ServiceError::NotFound(table.to_string()),
            StoreError::Conflict { table, key } => {
                ServiceError::AlreadyExists(format!("{} with this {}", table, key))
            }
            StoreError::Unavailable(_) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<MailError> for ServiceError {
    fn from(err: MailError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<EventBusError> for ServiceError {
    fn from(err: EventBusError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
