//! Claimant: an identity plus its resolved role set
//!
//! A claimant is what a token is minted from and what the authorization
//! resolver reasons about. It is a value; nothing mutates it after login.

use serde::{Deserialize, Serialize};

use crate::roles::{RoleAssignment, RoleLevel};

/// Identity and role snapshot of a caller.
///
/// # Examples
///
/// ```
/// use iam_org::{Claimant, RoleAssignment, RoleLevel};
///
/// let claimant = Claimant::new("acc-1", "a@x.com", vec![
///     RoleAssignment::org("acc-1", RoleLevel::Admin, "org-1"),
/// ]);
/// assert!(!claimant.is_superadmin());
/// assert_eq!(claimant.org_admin_of().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimant {
    /// Account ID
    pub account_id: String,

    /// Account email
    pub email: String,

    /// Role assignments as resolved at login
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

impl Claimant {
    /// Create a claimant from an identity and its roles.
    pub fn new(
        account_id: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<RoleAssignment>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            email: email.into(),
            roles,
        }
    }

    /// Check whether any role is resolvable at all.
    pub fn has_roles(&self) -> bool {
        !self.roles.is_empty()
    }

    /// Check if any assignment is Superadmin.
    pub fn is_superadmin(&self) -> bool {
        self.roles.iter().any(RoleAssignment::is_superadmin)
    }

    /// Assignments making this claimant an org admin.
    pub fn org_admin_of(&self) -> impl Iterator<Item = &RoleAssignment> {
        self.roles.iter().filter(|r| r.is_org_admin())
    }

    /// Assignments making this claimant a project admin.
    pub fn project_admin_of(&self) -> impl Iterator<Item = &RoleAssignment> {
        self.roles.iter().filter(|r| r.is_project_admin())
    }

    /// Highest role level held, if any.
    pub fn highest_level(&self) -> Option<RoleLevel> {
        self.roles.iter().map(|r| r.level).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_claimant_has_no_roles() {
        let claimant = Claimant::new("a", "a@x.com", vec![]);
        assert!(!claimant.has_roles());
        assert_eq!(claimant.highest_level(), None);
    }

    #[test]
    fn test_superadmin_detection() {
        let claimant = Claimant::new("a", "a@x.com", vec![RoleAssignment::superadmin("a")]);
        assert!(claimant.is_superadmin());
        assert_eq!(claimant.highest_level(), Some(RoleLevel::Superadmin));
    }

    #[test]
    fn test_claimant_serde() {
        let claimant = Claimant::new(
            "a",
            "a@x.com",
            vec![RoleAssignment::project("a", RoleLevel::Admin, "o", "p")],
        );
        let json = serde_json::to_string(&claimant).unwrap();
        let back: Claimant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claimant);
    }
}
