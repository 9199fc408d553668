//! Account domain model
//!
//! An account is the identity record every credential flow reads and
//! mutates. Passwords are only ever held as salted hashes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record of a registered user.
///
/// # Examples
///
/// ```
/// use iam_org::Account;
///
/// let account = Account::new("a@x.com", "$argon2id$v=19$...");
/// assert!(!account.verified);
/// assert!(!account.disabled);
/// assert!(account.last_login.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque unique identifier
    pub id: String,

    /// Login email (unique)
    pub email: String,

    /// Argon2 PHC string
    pub password_hash: String,

    /// Whether the email address has been verified
    pub verified: bool,

    /// Whether logins are refused
    pub disabled: bool,

    /// Single active verification / reset token
    #[serde(default)]
    pub verification_token: Option<String>,

    /// Avatar reference
    pub avatar_url: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates a new unverified, enabled account.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            email: email.into(),
            password_hash: password_hash.into(),
            verified: false,
            disabled: false,
            verification_token: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a successful login.
    pub fn mark_logged_in(&mut self) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.updated_at = now;
    }
}
