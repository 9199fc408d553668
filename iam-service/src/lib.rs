//! # IAM Service
//!
//! The identity façade: every operation a client can call, wired to the
//! resolver, the token manager, the login throttle and the collaborators.
//!
//! ## Overview
//!
//! The iam-service crate handles:
//! - **Flows**: Register, Login, RefreshAccessToken, ForgotPassword, ResetPassword, VerifyAccount
//! - **Management**: Accounts, role assignment, organizations and projects
//! - **Throttle**: Per-IP failure counting and temporary bans
//! - **Collaborators**: `Store`, `Mailer`, `EventBus` and the superuser list
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use iam_auth::JwtConfig;
//! use iam_service::dto::{LoginRequest, RegisterRequest, RequestContext};
//! use iam_service::{IdentityService, MemoryStore, ServiceConfig};
//!
//! # async fn example() {
//! let config = ServiceConfig {
//!     jwt: JwtConfig::with_secrets("access-secret", "refresh-secret"),
//!     ..Default::default()
//! };
//! let service = IdentityService::new(config, Arc::new(MemoryStore::new())).unwrap();
//! let ctx = RequestContext::from_peer("203.0.113.9:40000".parse().unwrap());
//!
//! service
//!     .register(&ctx, RegisterRequest {
//!         email: "a@x.com".into(),
//!         password: "hunter22".into(),
//!         password_confirm: "hunter22".into(),
//!     })
//!     .await;
//!
//! let response = service
//!     .login(&ctx, LoginRequest { email: "a@x.com".into(), password: "hunter22".into() })
//!     .await;
//! assert!(response.success);
//! # }
//! ```
//!
//! ## Responses
//!
//! Operations never return `Err`. Failures come back as an [`ApiResponse`]
//! with `success == false` and a typed [`ErrorReason`]; infrastructure detail
//! stays in the logs.
//!
//! ## Side effects
//!
//! Mail and events are best-effort. The caller waits at most
//! `side_effect_wait` for the first error, logs it, and succeeds anyway.

pub mod config;
pub mod dto;
pub mod endpoint;
pub mod error;
pub mod mailer;
pub mod memory;
pub mod service;
pub mod side_effects;
pub mod store;
pub mod superusers;
pub mod throttle;

// Re-export main types for convenience
pub use config::{ConfigError, MailSettings, ServiceConfig};
pub use dto::{ApiResponse, RequestContext};
pub use endpoint::Endpoint;
pub use error::{ErrorReason, ServiceError, ServiceResult};
pub use mailer::{LogMailer, MailError, Mailer, MemoryMailer, SentMail};
pub use memory::MemoryStore;
pub use service::IdentityService;
pub use side_effects::{Outcome, SideEffects, DEFAULT_SIDE_EFFECT_WAIT};
pub use store::{
    Cursor, Mutation, Page, PageRequest, Record, Repository, Row, SortOrder, Store, StoreError, StoreResult,
    Table,
};
pub use superusers::{Superuser, SuperuserSource};
pub use throttle::{LoginThrottle, ThrottlePolicy};
