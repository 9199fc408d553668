//! Names of the operations the façade exposes.
//!
//! These are the identifiers the public-route allow-list is written in.

use serde::{Deserialize, Serialize};

/// A façade operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Register,
    Login,
    ForgotPassword,
    ResetPassword,
    RefreshAccessToken,
    VerifyAccount,
    GetAccount,
    ListAccounts,
    SearchAccounts,
    UpdateAccount,
    DisableAccount,
    DeleteAccount,
    AssignAccountToRole,
    NewOrg,
    GetOrg,
    ListOrgs,
    UpdateOrg,
    DeleteOrg,
    NewProject,
    GetProject,
    ListProjects,
    UpdateProject,
    DeleteProject,
}

impl Endpoint {
    /// Every endpoint.
    pub const ALL: [Endpoint; 23] = [
        Endpoint::Register,
        Endpoint::Login,
        Endpoint::ForgotPassword,
        Endpoint::ResetPassword,
        Endpoint::RefreshAccessToken,
        Endpoint::VerifyAccount,
        Endpoint::GetAccount,
        Endpoint::ListAccounts,
        Endpoint::SearchAccounts,
        Endpoint::UpdateAccount,
        Endpoint::DisableAccount,
        Endpoint::DeleteAccount,
        Endpoint::AssignAccountToRole,
        Endpoint::NewOrg,
        Endpoint::GetOrg,
        Endpoint::ListOrgs,
        Endpoint::UpdateOrg,
        Endpoint::DeleteOrg,
        Endpoint::NewProject,
        Endpoint::GetProject,
        Endpoint::ListProjects,
        Endpoint::UpdateProject,
        Endpoint::DeleteProject,
    ];

    /// Endpoints reachable without a token in the default configuration.
    pub const PUBLIC: [Endpoint; 6] = [
        Endpoint::Register,
        Endpoint::Login,
        Endpoint::ForgotPassword,
        Endpoint::ResetPassword,
        Endpoint::RefreshAccessToken,
        Endpoint::VerifyAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Register => "Register",
            Endpoint::Login => "Login",
            Endpoint::ForgotPassword => "ForgotPassword",
            Endpoint::ResetPassword => "ResetPassword",
            Endpoint::RefreshAccessToken => "RefreshAccessToken",
            Endpoint::VerifyAccount => "VerifyAccount",
            Endpoint::GetAccount => "GetAccount",
            Endpoint::ListAccounts => "ListAccounts",
            Endpoint::SearchAccounts => "SearchAccounts",
            Endpoint::UpdateAccount => "UpdateAccount",
            Endpoint::DisableAccount => "DisableAccount",
            Endpoint::DeleteAccount => "DeleteAccount",
            Endpoint::AssignAccountToRole => "AssignAccountToRole",
            Endpoint::NewOrg => "NewOrg",
            Endpoint::GetOrg => "GetOrg",
            Endpoint::ListOrgs => "ListOrgs",
            Endpoint::UpdateOrg => "UpdateOrg",
            Endpoint::DeleteOrg => "DeleteOrg",
            Endpoint::NewProject => "NewProject",
            Endpoint::GetProject => "GetProject",
            Endpoint::ListProjects => "ListProjects",
            Endpoint::UpdateProject => "UpdateProject",
            Endpoint::DeleteProject => "DeleteProject",
        }
    }

    /// Parse an endpoint name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
