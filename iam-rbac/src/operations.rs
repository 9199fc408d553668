//! # Operations
//!
//! Every operation the authorization resolver can be asked about, grouped
//! into families so rules can speak about "account reads" or "project
//! mutations" instead of individual calls.

use serde::{Deserialize, Serialize};

/// Operations a caller may attempt on an account, organization or project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read a single account.
    ReadAccount,
    /// List or search accounts.
    ListAccounts,
    /// Update profile fields of an account.
    UpdateAccount,
    /// Enable or disable an account.
    DisableAccount,
    /// Remove an account.
    DeleteAccount,
    /// Assign a role to an account.
    AssignRole,

    /// Create an organization.
    CreateOrg,
    /// Read an organization.
    ReadOrg,
    /// List organizations.
    ListOrgs,
    /// Update an organization.
    UpdateOrg,
    /// Delete an organization and its projects.
    DeleteOrg,

    /// Create a project.
    CreateProject,
    /// Read a project.
    ReadProject,
    /// List projects.
    ListProjects,
    /// Update a project.
    UpdateProject,
    /// Delete a project.
    DeleteProject,
}

/// Operation families used by the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Reading a single record
    Read,
    /// Listing or searching
    List,
    /// Creating a record
    Create,
    /// Updating a record
    Update,
    /// Deleting a record
    Delete,
    /// Assigning roles
    AssignRole,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 16] = [
        Operation::ReadAccount,
        Operation::ListAccounts,
        Operation::UpdateAccount,
        Operation::DisableAccount,
        Operation::DeleteAccount,
        Operation::AssignRole,
        Operation::CreateOrg,
        Operation::ReadOrg,
        Operation::ListOrgs,
        Operation::UpdateOrg,
        Operation::DeleteOrg,
        Operation::CreateProject,
        Operation::ReadProject,
        Operation::ListProjects,
        Operation::UpdateProject,
        Operation::DeleteProject,
    ];

    /// Get the string representation of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ReadAccount => "read_account",
            Operation::ListAccounts => "list_accounts",
            Operation::UpdateAccount => "update_account",
            Operation::DisableAccount => "disable_account",
            Operation::DeleteAccount => "delete_account",
            Operation::AssignRole => "assign_role",
            Operation::CreateOrg => "create_org",
            Operation::ReadOrg => "read_org",
            Operation::ListOrgs => "list_orgs",
            Operation::UpdateOrg => "update_org",
            Operation::DeleteOrg => "delete_org",
            Operation::CreateProject => "create_project",
            Operation::ReadProject => "read_project",
            Operation::ListProjects => "list_projects",
            Operation::UpdateProject => "update_project",
            Operation::DeleteProject => "delete_project",
        }
    }

    /// Parse an operation from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == s)
    }

    /// Family of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ReadAccount | Operation::ReadOrg | Operation::ReadProject => OperationKind::Read,
            Operation::ListAccounts | Operation::ListOrgs | Operation::ListProjects => OperationKind::List,
            Operation::CreateOrg | Operation::CreateProject => OperationKind::Create,
            Operation::UpdateAccount
            | Operation::DisableAccount
            | Operation::UpdateOrg
            | Operation::UpdateProject => OperationKind::Update,
            Operation::DeleteAccount | Operation::DeleteOrg | Operation::DeleteProject => {
                OperationKind::Delete
            }
            Operation::AssignRole => OperationKind::AssignRole,
        }
    }

    /// Operations an account may always perform on itself.
    ///
    /// Only reading and updating the own profile; never role assignment,
    /// disabling or any org/project administration.
    pub fn is_self_service(&self) -> bool {
        matches!(self, Operation::ReadAccount | Operation::UpdateAccount)
    }

    /// Operations granted to an admin of the target's organization.
    ///
    /// Beyond listing, role assignment and project management this covers
    /// reading, updating and disabling accounts of the org and updating the
    /// org itself. Creating and deleting orgs stays with superadmins.
    pub fn is_org_admin_grant(&self) -> bool {
        matches!(
            self,
            Operation::ReadAccount
                | Operation::ListAccounts
                | Operation::UpdateAccount
                | Operation::DisableAccount
                | Operation::AssignRole
                | Operation::ReadOrg
                | Operation::UpdateOrg
                | Operation::ReadProject
                | Operation::ListProjects
                | Operation::CreateProject
                | Operation::UpdateProject
                | Operation::DeleteProject
        )
    }

    /// Operations granted to an admin of the target's project.
    pub fn is_project_admin_grant(&self) -> bool {
        matches!(
            self,
            Operation::ReadAccount
                | Operation::ListAccounts
                | Operation::UpdateAccount
                | Operation::ReadProject
                | Operation::UpdateProject
                | Operation::ListProjects
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
