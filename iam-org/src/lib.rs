//! # IAM Records
//!
//! This crate provides the tenant records the IAM core reasons about:
//! accounts, organizations, projects, role assignments and login attempts.
//!
//! ## Overview
//!
//! The iam-org crate handles:
//! - **Accounts**: Identity records with hashed credentials and verification state
//! - **Organizations**: Top-level tenants
//! - **Projects**: Workspaces inside an organization
//! - **Roles**: The fixed Guest < Member < Admin < Superadmin ladder and scoped assignments
//! - **Claimants**: Identity plus role snapshot, as embedded in tokens
//! - **Login attempts**: Per-IP failure counters used by the login throttle
//!
//! ## Architecture
//!
//! ```text
//! Account
//!   └─ RoleAssignment ─→ (global | Organization | Organization/Project)
//!
//! Organization
//!   └─ Projects
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use iam_org::{Account, Organization, Project, RoleAssignment, RoleLevel};
//!
//! let owner = Account::new("owner@acme.test", "$argon2id$...");
//! let org = Organization::new("Acme Corp", owner.id.clone());
//! let project = Project::new(org.id.clone(), "Marketing Docs", owner.id.clone());
//!
//! let role = RoleAssignment::project(owner.id.clone(), RoleLevel::Admin, org.id.clone(), project.id.clone());
//! assert!(role.is_project_admin());
//! ```

pub mod account;
pub mod claimant;
pub mod login_attempt;
pub mod organization;
pub mod project;
pub mod roles;

// Re-export main types for convenience
pub use account::Account;
pub use claimant::Claimant;
pub use login_attempt::LoginAttempt;
pub use organization::{ContactInfo, Organization};
pub use project::Project;
pub use roles::{RoleAssignment, RoleLevel, Scope};
