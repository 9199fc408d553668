//! Bootstrap administrators
//!
//! A read-only list of credentials loaded from a JSON file. It is consulted
//! only when the store has no account for an email, so the system can be
//! operated before any account exists. Superusers are not stored rows.

use std::path::Path;

use iam_org::{Account, RoleAssignment};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One bootstrap administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superuser {
    /// Login email
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Avatar reference
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Superuser {
    /// Stable account id derived from the email.
    pub fn account_id(&self) -> String {
        format!("superuser:{}", self.email)
    }

    /// Account view of this superuser. Verified and enabled.
    pub fn account(&self) -> Account {
        let mut account = Account::new(self.email.clone(), self.password_hash.clone());
        account.id = self.account_id();
        account.verified = true;
        account.avatar_url = self.avatar_url.clone();
        account
    }

    /// Global Superadmin assignment.
    pub fn role(&self) -> RoleAssignment {
        RoleAssignment::superadmin(self.account_id())
    }
}

/// Read-only superuser list.
#[derive(Debug, Clone, Default)]
pub struct SuperuserSource {
    users: Vec<Superuser>,
}

impl SuperuserSource {
    /// No superusers.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(users: Vec<Superuser>) -> Self {
        Self { users }
    }

    /// Parse a JSON array of superusers.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let users: Vec<Superuser> = serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
            key: "superusers".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(users))
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            key: "superusers_file".to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        let source = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), count = source.len(), "loaded superusers");
        Ok(source)
    }

    /// Superuser with this email (case-insensitive).
    pub fn find(&self, email: &str) -> Option<&Superuser> {
        self.users.iter().find(|u| u.email.eq_ignore_ascii_case(email))
    }

    /// Superuser behind a derived account id.
    pub fn find_by_account_id(&self, account_id: &str) -> Option<&Superuser> {
        self.users.iter().find(|u| u.account_id() == account_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
