//! # IAM Authentication
//!
//! This crate provides the credential lifecycle of the IAM core.
//!
//! ## Overview
//!
//! The iam-auth crate handles:
//! - **JWT**: Access/refresh pairs, validation and renewal
//! - **Gateway**: Bearer-token authentication with a public-operation allow-list
//! - **Credentials**: Argon2id password hashing and one-time tokens
//!
//! ## Features
//!
//! - `jwt` (default): JWT token support using jsonwebtoken
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iam_auth::{TokenManager, TokenType};
//! use iam_org::{Claimant, RoleAssignment, RoleLevel};
//!
//! let tokens = TokenManager::with_secrets("access-secret", "refresh-secret").unwrap();
//! let claimant = Claimant::new("acc-1", "a@x.com", vec![RoleAssignment::global("acc-1", RoleLevel::Guest)]);
//!
//! let pair = tokens.new_token_pair(&claimant).unwrap();
//! let claims = tokens.parse_token(&pair.access_token, TokenType::Access).unwrap();
//! assert_eq!(claims.claimant(), claimant);
//!
//! let refresh = tokens.parse_token(&pair.refresh_token, TokenType::Refresh).unwrap();
//! let renewed = tokens.renew_access_token(&refresh).unwrap();
//! ```
//!
//! ## Token kinds
//!
//! Access and refresh tokens are signed with independent keys and carry a
//! `token_type` claim; neither is accepted where the other is expected.
//! `TokenExpired` and `InvalidToken` are distinct so callers can tell
//! "refresh" from "log in again".

pub mod claims;
pub mod credentials;
pub mod error;
#[cfg(feature = "jwt")]
pub mod gateway;
#[cfg(feature = "jwt")]
pub mod jwt;

// Re-export main types for convenience
pub use claims::{TokenClaims, TokenType, DEFAULT_ISSUER};
pub use credentials::{generate_token, tokens_match, HashParams, Password, PasswordHasherService};
pub use error::{AuthError, AuthResult};
#[cfg(feature = "jwt")]
pub use gateway::{bearer_token, TokenGateway};
#[cfg(feature = "jwt")]
pub use jwt::{
    JwtAlgorithm, JwtConfig, KeyMaterial, TokenManager, TokenPair, MAX_TOKEN_TTL_SECS,
};
