//! # Rule table
//!
//! Authorization precedence as an ordered list of `(predicate, effect)`
//! rules. The resolver walks the list top-down and the first rule whose
//! predicate holds decides; when none holds the request is denied.
//!
//! Default order:
//!
//! ```text
//! 1. superadmin     caller holds Superadmin                 → allow
//! 2. self-service   caller is the target account, read/update → allow
//! 3. org-admin      Admin of the target's org                 → allow org-admin grants
//! 4. project-admin  Admin of the target's project             → allow project-admin grants
//! (fallthrough)                                               → deny
//! ```

use iam_org::{Claimant, RoleLevel};

use crate::operations::Operation;
use crate::target::Target;

/// What a matching rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Permit the operation
    Allow,
    /// Refuse the operation, stopping evaluation
    Deny,
}

/// Predicate signature shared by every rule.
pub type Predicate = fn(&Claimant, Operation, &Target) -> bool;

/// One entry of the rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable rule name, recorded on decisions
    pub name: &'static str,
    /// When the rule applies
    pub applies: Predicate,
    /// Effect when it applies
    pub effect: Effect,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("effect", &self.effect)
            .finish()
    }
}

impl Rule {
    /// Create an allow rule.
    pub const fn allow(name: &'static str, applies: Predicate) -> Self {
        Self {
            name,
            applies,
            effect: Effect::Allow,
        }
    }

    /// Create a deny rule.
    pub const fn deny(name: &'static str, applies: Predicate) -> Self {
        Self {
            name,
            applies,
            effect: Effect::Deny,
        }
    }
}

/// Caller holds Superadmin.
pub fn superadmin(caller: &Claimant, _op: Operation, _target: &Target) -> bool {
    caller.is_superadmin()
}

/// Caller acts on its own account with a self-service operation.
pub fn self_service(caller: &Claimant, op: Operation, target: &Target) -> bool {
    op.is_self_service() && target.account_id.as_deref() == Some(caller.account_id.as_str())
}

/// Caller is Admin of the organization the target sits in.
pub fn org_admin(caller: &Claimant, op: Operation, target: &Target) -> bool {
    if !op.is_org_admin_grant() || target.org_id.is_none() {
        return false;
    }
    if target.role_level.is_some_and(|level| level >= RoleLevel::Superadmin) {
        return false;
    }
    caller.org_admin_of().any(|role| role.org_id == target.org_id)
}

/// Caller is Admin of the project the target sits in.
pub fn project_admin(caller: &Claimant, op: Operation, target: &Target) -> bool {
    if !op.is_project_admin_grant() || target.project_id.is_none() {
        return false;
    }
    caller.project_admin_of().any(|role| {
        role.project_id == target.project_id
            && target.org_id.as_ref().map_or(true, |org| role.org_id.as_ref() == Some(org))
    })
}

/// The default precedence order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::allow("superadmin", superadmin),
        Rule::allow("self-service", self_service),
        Rule::allow("org-admin", org_admin),
        Rule::allow("project-admin", project_admin),
    ]
}
