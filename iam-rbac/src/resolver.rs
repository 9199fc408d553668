//! # Authorization resolver
//!
//! Answers "may caller C perform operation O on target T" by walking the
//! rule table, and derives the storage predicate for listings.

use iam_org::Claimant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::QueryFilter;
use crate::operations::Operation;
use crate::rules::{default_rules, Effect, Rule};
use crate::target::{Listing, Target};

/// Authorization failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthzError {
    /// No identity, or an identity without any resolvable role
    #[error("Unauthenticated: no resolvable role assignment")]
    Unauthenticated,

    /// Valid identity, insufficient scope
    #[error("Permission denied: {account_id} may not {operation}")]
    PermissionDenied {
        /// Caller account
        account_id: String,
        /// Operation attempted
        operation: Operation,
        /// Caller's role context, e.g. `admin@org:o1`
        roles: Vec<String>,
    },
}

/// Result type for authorization checks.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Successful authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Name of the rule that allowed the operation
    pub rule: String,
}

/// Rule-driven authorization resolver.
///
/// # Example
///
/// ```
/// use iam_org::{Claimant, RoleAssignment, RoleLevel};
/// use iam_rbac::{Operation, Resolver, Target};
///
/// let resolver = Resolver::new();
/// let admin = Claimant::new("a", "a@x.com", vec![RoleAssignment::org("a", RoleLevel::Admin, "o1")]);
///
/// assert!(resolver.is_allowed(Some(&admin), Operation::CreateProject, &Target::org("o1")));
/// assert!(!resolver.is_allowed(Some(&admin), Operation::CreateProject, &Target::org("o2")));
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    rules: Vec<Rule>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver with the default precedence order.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Resolver with a custom rule table.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The rule table, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Decide whether `caller` may perform `op` on `target`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when there is no caller or it holds no role
    /// - `PermissionDenied` when no rule allows the operation
    pub fn authorize(
        &self,
        caller: Option<&Claimant>,
        op: Operation,
        target: &Target,
    ) -> AuthzResult<Decision> {
        let claimant = Self::require(caller)?;

        for rule in &self.rules {
            if !(rule.applies)(claimant, op, target) {
                continue;
            }
            match rule.effect {
                Effect::Allow => {
                    return Ok(Decision {
                        rule: rule.name.to_string(),
                    })
                }
                Effect::Deny => break,
            }
        }

        Err(Self::denied(claimant, op))
    }

    /// Boolean form of [`Resolver::authorize`].
    pub fn is_allowed(&self, caller: Option<&Claimant>, op: Operation, target: &Target) -> bool {
        self.authorize(caller, op, target).is_ok()
    }

    /// Derive the storage predicate for a listing.
    ///
    /// - Superadmin: empty filter (narrowed by any requested scope)
    /// - Org admin: the org
    /// - Project admin: the org and the project
    /// - Everyone else: their own account
    ///
    /// A requested scope picks among several admin assignments and can only
    /// narrow the result, never widen it.
    pub fn list_filter(
        &self,
        caller: Option<&Claimant>,
        listing: Listing,
        requested: &Target,
    ) -> AuthzResult<QueryFilter> {
        let claimant = Self::require(caller)?;
        let columns = listing.columns();

        let mut filter = if claimant.is_superadmin() {
            QueryFilter::new()
        } else if let Some(role) = claimant
            .org_admin_of()
            .find(|r| requested.org_id.is_none() || r.org_id == requested.org_id)
        {
            let mut filter = QueryFilter::new();
            if let Some(org_id) = &role.org_id {
                filter.insert(columns.org, org_id.clone());
            }
            filter
        } else if let Some(role) = claimant.project_admin_of().find(|r| {
            (requested.org_id.is_none() || r.org_id == requested.org_id)
                && (requested.project_id.is_none() || r.project_id == requested.project_id)
        }) {
            let mut filter = QueryFilter::new();
            if let Some(org_id) = &role.org_id {
                filter.insert(columns.org, org_id.clone());
            }
            if let (Some(column), Some(project_id)) = (columns.project, &role.project_id) {
                filter.insert(column, project_id.clone());
            }
            filter
        } else {
            QueryFilter::single(columns.account, claimant.account_id.clone())
        };

        // Narrow to the requested scope without overriding what is already pinned.
        if let Some(org_id) = &requested.org_id {
            if filter.get(columns.org).is_none() {
                filter.insert(columns.org, org_id.clone());
            }
        }
        if let (Some(column), Some(project_id)) = (columns.project, &requested.project_id) {
            if filter.get(column).is_none() {
                filter.insert(column, project_id.clone());
            }
        }

        tracing::debug!(
            account_id = %claimant.account_id,
            listing = ?listing,
            predicates = filter.len(),
            "derived listing filter"
        );
        Ok(filter)
    }

    fn require(caller: Option<&Claimant>) -> AuthzResult<&Claimant> {
        match caller {
            Some(claimant) if claimant.has_roles() => Ok(claimant),
            _ => Err(AuthzError::Unauthenticated),
        }
    }

    fn denied(claimant: &Claimant, op: Operation) -> AuthzError {
        let roles: Vec<String> = claimant
            .roles
            .iter()
            .map(|r| match (&r.org_id, &r.project_id) {
                (Some(org), Some(project)) => format!("{}@project:{}/{}", r.level, org, project),
                (Some(org), None) => format!("{}@org:{}", r.level, org),
                _ => r.level.to_string(),
            })
            .collect();

        tracing::debug!(
            account_id = %claimant.account_id,
            operation = %op,
            roles = ?roles,
            "authorization denied"
        );

        AuthzError::PermissionDenied {
            account_id: claimant.account_id.clone(),
            operation: op,
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use iam_org::{RoleAssignment, RoleLevel, Scope};

    fn superadmin() -> Claimant {
        Claimant::new("root", "root@x.com", vec![RoleAssignment::superadmin("root")])
    }

    fn org_admin(org: &str) -> Claimant {
        Claimant::new("oa", "oa@x.com", vec![RoleAssignment::org("oa", RoleLevel::Admin, org)])
    }

    fn project_admin(org: &str, project: &str) -> Claimant {
        Claimant::new(
            "pa",
            "pa@x.com",
            vec![RoleAssignment::project("pa", RoleLevel::Admin, org, project)],
        )
    }

    fn guest(id: &str) -> Claimant {
        Claimant::new(id, format!("{id}@x.com"), vec![RoleAssignment::global(id, RoleLevel::Guest)])
    }

    fn targets() -> Vec<Target> {
        vec![
            Target::none(),
            Target::org("o1"),
            Target::org("o2"),
            Target::project("o1", "p1"),
            Target::project("o9", "p9"),
            Target::account("someone", &Scope::Global),
            Target::account("someone", &Scope::Org { org_id: "o3".into() }),
            Target::role_grant("someone", RoleLevel::Superadmin, None, None),
        ]
    }

    #[test]
    fn test_superadmin_allowed_everything() {
        let resolver = Resolver::new();
        let caller = superadmin();
        for op in Operation::ALL {
            for target in targets() {
                let decision = resolver.authorize(Some(&caller), op, &target).unwrap();
                assert_eq!(decision.rule, "superadmin");
            }
        }
    }

    #[test]
    fn test_org_admin_denied_on_foreign_projects() {
        let resolver = Resolver::new();
        for (admin_org, project_org) in [("o1", "o2"), ("o2", "o1"), ("a", "b")] {
            let caller = org_admin(admin_org);
            for op in [
                Operation::CreateProject,
                Operation::ReadProject,
                Operation::UpdateProject,
                Operation::DeleteProject,
            ] {
                let err = resolver
                    .authorize(Some(&caller), op, &Target::project(project_org, "p"))
                    .unwrap_err();
                assert!(matches!(err, AuthzError::PermissionDenied { .. }));
            }
        }
    }

    #[test]
    fn test_org_admin_manages_own_org_projects() {
        let resolver = Resolver::new();
        let caller = org_admin("o1");
        for op in [Operation::CreateProject, Operation::UpdateProject, Operation::DeleteProject] {
            assert!(resolver.is_allowed(Some(&caller), op, &Target::project("o1", "any")));
        }
        assert!(!resolver.is_allowed(Some(&caller), Operation::DeleteOrg, &Target::org("o1")));
        assert!(!resolver.is_allowed(Some(&caller), Operation::CreateOrg, &Target::none()));
    }

    #[test]
    fn test_project_admin_is_limited_to_project() {
        let resolver = Resolver::new();
        let caller = project_admin("o1", "p1");

        assert!(resolver.is_allowed(Some(&caller), Operation::UpdateProject, &Target::project("o1", "p1")));
        assert!(!resolver.is_allowed(Some(&caller), Operation::UpdateProject, &Target::project("o1", "p2")));
        assert!(!resolver.is_allowed(Some(&caller), Operation::UpdateOrg, &Target::org("o1")));
        assert!(!resolver.is_allowed(Some(&caller), Operation::AssignRole, &Target::project("o1", "p1")));

        let member = Target::account("m", &Scope::Project { org_id: "o1".into(), project_id: "p1".into() });
        assert!(resolver.is_allowed(Some(&caller), Operation::UpdateAccount, &member));
        assert!(!resolver.is_allowed(Some(&caller), Operation::DisableAccount, &member));
    }

    #[test]
    fn test_guest_is_self_only() {
        let resolver = Resolver::new();
        let caller = guest("g");

        assert!(resolver.is_allowed(Some(&caller), Operation::ReadAccount, &Target::account("g", &Scope::Global)));
        assert!(resolver.is_allowed(Some(&caller), Operation::UpdateAccount, &Target::account("g", &Scope::Global)));
        assert!(!resolver.is_allowed(Some(&caller), Operation::ReadAccount, &Target::account("h", &Scope::Global)));
        assert!(!resolver.is_allowed(Some(&caller), Operation::AssignRole, &Target::account("g", &Scope::Global)));
    }

    #[test]
    fn test_missing_roles_is_unauthenticated() {
        let resolver = Resolver::new();
        let stale = Claimant::new("x", "x@x.com", vec![]);

        assert_eq!(
            resolver.authorize(None, Operation::ReadOrg, &Target::org("o")),
            Err(AuthzError::Unauthenticated)
        );
        assert_eq!(
            resolver.authorize(Some(&stale), Operation::ReadOrg, &Target::org("o")),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_denial_records_role_context() {
        let resolver = Resolver::new();
        let err = resolver
            .authorize(Some(&org_admin("o1")), Operation::DeleteOrg, &Target::org("o1"))
            .unwrap_err();

        match err {
            AuthzError::PermissionDenied { account_id, operation, roles } => {
                assert_eq!(account_id, "oa");
                assert_eq!(operation, Operation::DeleteOrg);
                assert_eq!(roles, vec!["admin@org:o1".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deny_rule_stops_evaluation() {
        fn everyone(_: &Claimant, _: Operation, _: &Target) -> bool {
            true
        }
        let resolver = Resolver::with_rules(vec![Rule::deny("lockdown", everyone), Rule::allow("all", everyone)]);
        assert!(!resolver.is_allowed(Some(&superadmin()), Operation::ReadOrg, &Target::org("o")));
    }

    #[test]
    fn test_list_filters_per_role() {
        let resolver = Resolver::new();
        let none = Target::none();

        let filter = resolver.list_filter(Some(&superadmin()), Listing::Accounts, &none).unwrap();
        assert!(filter.is_empty());

        let filter = resolver.list_filter(Some(&org_admin("o1")), Listing::Accounts, &none).unwrap();
        assert_eq!(filter, QueryFilter::single("org_id", "o1"));

        let filter = resolver
            .list_filter(Some(&project_admin("o1", "p1")), Listing::Accounts, &none)
            .unwrap();
        assert_eq!(filter, QueryFilter::single("org_id", "o1").with("project_id", "p1"));

        let filter = resolver.list_filter(Some(&guest("g")), Listing::Accounts, &none).unwrap();
        assert_eq!(filter, QueryFilter::single("account_id", "g"));
    }

    #[test]
    fn test_list_filter_uses_table_columns() {
        let resolver = Resolver::new();
        let none = Target::none();

        let filter = resolver.list_filter(Some(&org_admin("o1")), Listing::Orgs, &none).unwrap();
        assert_eq!(filter, QueryFilter::single("id", "o1"));

        let filter = resolver
            .list_filter(Some(&project_admin("o1", "p1")), Listing::Projects, &none)
            .unwrap();
        assert_eq!(filter, QueryFilter::single("org_id", "o1").with("id", "p1"));

        let filter = resolver.list_filter(Some(&guest("g")), Listing::Projects, &none).unwrap();
        assert_eq!(filter, QueryFilter::single("owner_id", "g"));
    }

    #[test]
    fn test_requested_scope_never_widens() {
        let resolver = Resolver::new();

        // Asking for another org falls back to the caller's own rows.
        let filter = resolver
            .list_filter(Some(&org_admin("o1")), Listing::Accounts, &Target::org("o2"))
            .unwrap();
        assert_eq!(filter, QueryFilter::single("account_id", "oa").with("org_id", "o2"));

        // A project inside the admin's org narrows the listing.
        let filter = resolver
            .list_filter(Some(&org_admin("o1")), Listing::Accounts, &Target::project("o1", "p1"))
            .unwrap();
        assert_eq!(filter, QueryFilter::single("org_id", "o1").with("project_id", "p1"));
    }

    #[test]
    fn test_requested_scope_picks_admin_assignment() {
        let resolver = Resolver::new();
        let caller = Claimant::new(
            "multi",
            "m@x.com",
            vec![
                RoleAssignment::org("multi", RoleLevel::Admin, "o1"),
                RoleAssignment::org("multi", RoleLevel::Admin, "o2"),
            ],
        );
        let filter = resolver.list_filter(Some(&caller), Listing::Projects, &Target::org("o2")).unwrap();
        assert_eq!(filter, QueryFilter::single("org_id", "o2"));
    }

    #[test]
    fn test_list_filter_requires_roles() {
        let resolver = Resolver::new();
        assert_eq!(
            resolver.list_filter(None, Listing::Orgs, &Target::none()),
            Err(AuthzError::Unauthenticated)
        );
    }
}
