//! Role hierarchy and role assignments
//!
//! This module defines the fixed role ladder shared by every tenant and the
//! assignment record that binds an account to a role within a scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role level of an account.
///
/// Roles are hierarchical. The hierarchy is: Guest < Member < Admin < Superadmin
///
/// # Permission Model
///
/// - **Guest**: Freshly registered account, may only act on itself
/// - **Member**: Belongs to an org or project, may only act on itself
/// - **Admin**: Manages accounts and projects inside its scope
/// - **Superadmin**: Global, unscoped, allowed everything
///
/// # Examples
///
/// ```
/// use iam_org::RoleLevel;
///
/// assert!(RoleLevel::Admin.is_admin());
/// assert!(!RoleLevel::Member.is_admin());
/// assert_eq!(RoleLevel::from_i32(4), Some(RoleLevel::Superadmin));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleLevel {
    /// Registered but unaffiliated
    Guest = 1,

    /// Regular member of an org or project
    Member = 2,

    /// Administrator of an org or project
    Admin = 3,

    /// Global administrator
    Superadmin = 4,
}

impl RoleLevel {
    /// Check if this level carries administrative powers.
    ///
    /// # Returns
    ///
    /// `true` for Admin and Superadmin
    pub fn is_admin(&self) -> bool {
        *self >= RoleLevel::Admin
    }

    /// Check if this level is the global administrator.
    pub fn is_superadmin(&self) -> bool {
        *self == RoleLevel::Superadmin
    }

    /// Numeric wire value of the level.
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Parse a numeric wire value.
    ///
    /// # Returns
    ///
    /// `Some(RoleLevel)` for 1..=4, `None` otherwise
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Guest),
            2 => Some(Self::Member),
            3 => Some(Self::Admin),
            4 => Some(Self::Superadmin),
            _ => None,
        }
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use iam_org::RoleLevel;
    ///
    /// assert_eq!(RoleLevel::parse("admin"), Some(RoleLevel::Admin));
    /// assert_eq!(RoleLevel::parse("SUPERADMIN"), Some(RoleLevel::Superadmin));
    /// assert_eq!(RoleLevel::parse("owner"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "superadmin" => Some(Self::Superadmin),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Guest => "Guest",
            Self::Member => "Member",
            Self::Admin => "Admin",
            Self::Superadmin => "Superadmin",
        }
    }
}

impl Default for RoleLevel {
    fn default() -> Self {
        Self::Guest
    }
}

impl std::fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The org/project boundary a role assignment is limited to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// No boundary (Superadmin, or an unaffiliated Guest)
    Global,

    /// Every project under an organization
    Org {
        /// Organization ID
        org_id: String,
    },

    /// A single project (and the org that owns it)
    Project {
        /// Owning organization ID
        org_id: String,
        /// Project ID
        project_id: String,
    },
}

impl Scope {
    /// Organization this scope sits in, if any.
    pub fn org_id(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Org { org_id } | Scope::Project { org_id, .. } => Some(org_id),
        }
    }

    /// Project this scope is limited to, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Scope::Project { project_id, .. } => Some(project_id),
            _ => None,
        }
    }
}

/// Binds an account to a role level within a scope.
///
/// An account has exactly one assignment; the row is keyed by the account ID
/// and assigning a new role overwrites level and scope in place.
///
/// # Examples
///
/// ```
/// use iam_org::{RoleAssignment, RoleLevel};
///
/// let role = RoleAssignment::org("acc-1", RoleLevel::Admin, "org-1");
/// assert!(role.is_org_admin());
/// assert_eq!(role.org_id.as_deref(), Some("org-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Account holding the role
    pub account_id: String,

    /// Role level
    pub level: RoleLevel,

    /// Organization scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Project scope (always together with `org_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// When the assignment was created
    pub created_at: DateTime<Utc>,

    /// When the assignment was last overwritten
    pub updated_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Creates an unscoped assignment.
    pub fn global(account_id: impl Into<String>, level: RoleLevel) -> Self {
        let now = Utc::now();
        Self {
            account_id: account_id.into(),
            level,
            org_id: None,
            project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an org-scoped assignment.
    pub fn org(account_id: impl Into<String>, level: RoleLevel, org_id: impl Into<String>) -> Self {
        Self {
            org_id: Some(org_id.into()),
            ..Self::global(account_id, level)
        }
    }

    /// Creates a project-scoped assignment.
    pub fn project(
        account_id: impl Into<String>,
        level: RoleLevel,
        org_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: Some(org_id.into()),
            project_id: Some(project_id.into()),
            ..Self::global(account_id, level)
        }
    }

    /// Superadmin assignment (never scoped).
    pub fn superadmin(account_id: impl Into<String>) -> Self {
        Self::global(account_id, RoleLevel::Superadmin)
    }

    /// Scope of this assignment.
    pub fn scope(&self) -> Scope {
        match (&self.org_id, &self.project_id) {
            (Some(org_id), Some(project_id)) => Scope::Project {
                org_id: org_id.clone(),
                project_id: project_id.clone(),
            },
            (Some(org_id), None) => Scope::Org {
                org_id: org_id.clone(),
            },
            _ => Scope::Global,
        }
    }

    /// Check if this is the global administrator.
    pub fn is_superadmin(&self) -> bool {
        self.level.is_superadmin()
    }

    /// Admin scoped to a whole organization.
    pub fn is_org_admin(&self) -> bool {
        self.level == RoleLevel::Admin && self.org_id.is_some() && self.project_id.is_none()
    }

    /// Admin scoped to a single project.
    pub fn is_project_admin(&self) -> bool {
        self.level == RoleLevel::Admin && self.project_id.is_some()
    }

    /// Overwrite level and scope, keeping the row identity.
    pub fn reassign(&mut self, level: RoleLevel, org_id: Option<String>, project_id: Option<String>) {
        self.level = level;
        self.org_id = org_id;
        self.project_id = project_id;
        self.updated_at = Utc::now();
    }
}
