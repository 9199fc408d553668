//! # IAM RBAC (Role-Based Access Control)
//!
//! This crate decides whether a caller may act on a target account,
//! organization or project, and derives the storage predicate for listings.
//!
//! ## Overview
//!
//! The iam-rbac crate handles:
//! - **Operations**: Everything a caller can ask to do, grouped in families
//! - **Targets**: The account/org/project identifiers an operation aims at
//! - **Rules**: An ordered `(predicate, effect)` table, evaluated top-down
//! - **Filters**: Equality predicates handed to storage for listings
//!
//! ## Precedence
//!
//! ```text
//! 1. Superadmin                         → allow
//! 2. Self (read/update own profile)     → allow
//! 3. Admin of the target's org          → allow org-admin grants
//! 4. Admin of the target's project      → allow project-admin grants
//! 5. otherwise                          → PermissionDenied
//! ```
//!
//! A caller without any role assignment is `Unauthenticated`, which is kept
//! distinct from `PermissionDenied`.
//!
//! ## Usage
//!
//! ```rust
//! use iam_org::{Claimant, RoleAssignment, RoleLevel};
//! use iam_rbac::{Listing, Operation, QueryFilter, Resolver, Target};
//!
//! let resolver = Resolver::new();
//! let admin = Claimant::new("a", "a@x.com", vec![RoleAssignment::org("a", RoleLevel::Admin, "o1")]);
//!
//! assert!(resolver.is_allowed(Some(&admin), Operation::DeleteProject, &Target::project("o1", "p1")));
//!
//! let filter = resolver.list_filter(Some(&admin), Listing::Projects, &Target::none()).unwrap();
//! assert_eq!(filter, QueryFilter::single("org_id", "o1"));
//! ```
//!
//! ## Storage independence
//!
//! The resolver never reads rows. Callers load the target's scope, ask for a
//! decision, and hand listing filters to whatever store they use.

pub mod filter;
pub mod operations;
pub mod resolver;
pub mod rules;
pub mod target;

// Re-export main types for convenience
pub use filter::QueryFilter;
pub use operations::{Operation, OperationKind};
pub use resolver::{AuthzError, AuthzResult, Decision, Resolver};
pub use rules::{Effect, Rule};
pub use target::{FilterColumns, Listing, Target};
