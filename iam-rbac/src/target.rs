//! # Targets
//!
//! The resource an operation is aimed at, reduced to the identifiers the
//! rules compare against: the account, and the org/project scope it sits in.

use iam_org::{RoleAssignment, RoleLevel, Scope};
use serde::{Deserialize, Serialize};

/// Resource an operation acts on.
///
/// # Example
///
/// ```
/// use iam_rbac::Target;
///
/// let target = Target::project("org-1", "proj-1");
/// assert_eq!(target.org_id.as_deref(), Some("org-1"));
/// assert!(target.account_id.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Account the operation is about
    pub account_id: Option<String>,

    /// Organization the target sits in
    pub org_id: Option<String>,

    /// Project the target sits in
    pub project_id: Option<String>,

    /// Role level being granted (role assignment only)
    pub role_level: Option<RoleLevel>,
}

impl Target {
    /// Target without any identifiers (e.g. creating an org).
    pub fn none() -> Self {
        Self::default()
    }

    /// An account, placed in the scope of its role assignment.
    pub fn account(account_id: impl Into<String>, scope: &Scope) -> Self {
        Self {
            account_id: Some(account_id.into()),
            org_id: scope.org_id().map(str::to_string),
            project_id: scope.project_id().map(str::to_string),
            role_level: None,
        }
    }

    /// An account whose role assignment is already loaded.
    pub fn account_with_role(role: &RoleAssignment) -> Self {
        Self::account(role.account_id.clone(), &role.scope())
    }

    /// An organization.
    pub fn org(org_id: impl Into<String>) -> Self {
        Self {
            org_id: Some(org_id.into()),
            ..Self::default()
        }
    }

    /// A project within its organization.
    pub fn project(org_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            org_id: Some(org_id.into()),
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    /// The role assignment an account is about to receive.
    pub fn role_grant(
        account_id: impl Into<String>,
        level: RoleLevel,
        org_id: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            org_id,
            project_id,
            role_level: Some(level),
        }
    }
}

/// Which table a listing runs against, and how its columns are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Listing {
    /// Accounts, listed through their role assignments
    Accounts,
    /// Organizations
    Orgs,
    /// Projects
    Projects,
}

/// Column names a scope filter is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterColumns {
    /// Column holding the owning / subject account ID
    pub account: &'static str,
    /// Column holding the organization ID
    pub org: &'static str,
    /// Column holding the project ID, if the table has one
    pub project: Option<&'static str>,
}

impl Listing {
    /// Column names for this listing.
    pub fn columns(&self) -> FilterColumns {
        match self {
            Listing::Accounts => FilterColumns {
                account: "account_id",
                org: "org_id",
                project: Some("project_id"),
            },
            Listing::Orgs => FilterColumns {
                account: "owner_id",
                org: "id",
                project: None,
            },
            Listing::Projects => FilterColumns {
                account: "owner_id",
                org: "org_id",
                project: Some("id"),
            },
        }
    }

    /// Operation checked for this listing.
    pub fn operation(&self) -> crate::Operation {
        match self {
            Listing::Accounts => crate::Operation::ListAccounts,
            Listing::Orgs => crate::Operation::ListOrgs,
            Listing::Projects => crate::Operation::ListProjects,
        }
    }
}
