//! Request and response shapes of the façade.
//!
//! Every operation answers with an [`ApiResponse`]; failures are carried in
//! it as a typed [`ErrorReason`] instead of escaping as errors.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use iam_org::{Account, ContactInfo, RoleAssignment, RoleLevel};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorReason, ServiceError};
use crate::store::{Cursor, PageRequest, SortOrder, DEFAULT_PAGE_SIZE};

/// Uniform response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_reason: None,
            data: Some(data),
        }
    }

    /// Failed response; infrastructure detail is not included.
    pub fn from_error(err: &ServiceError) -> Self {
        Self {
            success: false,
            message: err.public_message(),
            error_reason: Some(err.reason()),
            data: None,
        }
    }

    /// The payload of a successful response.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Transport facts about the inbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Peer address as seen by the transport
    pub peer_addr: Option<SocketAddr>,
    /// Raw `Authorization` value
    pub authorization: Option<String>,
}

impl RequestContext {
    /// Anonymous call from `peer_addr`.
    pub fn from_peer(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr: Some(peer_addr),
            authorization: None,
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer(mut self, access_token: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", access_token));
        self
    }

    /// Client IP used by the login throttle.
    pub fn client_ip(&self) -> Option<String> {
        self.peer_addr.map(|addr| addr.ip().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub verification_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyAccountRequest {
    pub account_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyAccountResponse {
    pub account_id: String,
    pub verified: bool,
}

/// Account as returned to callers. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub verified: bool,
    pub disabled: bool,
    pub avatar_url: Option<String>,
    pub role: Option<RoleAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AccountView {
    pub fn new(account: Account, role: Option<RoleAssignment>) -> Self {
        Self {
            id: account.id,
            email: account.email,
            verified: account.verified,
            disabled: account.disabled,
            avatar_url: account.avatar_url,
            role,
            created_at: account.created_at,
            updated_at: account.updated_at,
            last_login: account.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIdRequest {
    pub account_id: String,
}

/// Listing parameters shared by accounts, orgs and projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    /// Narrow to an organization
    #[serde(default)]
    pub org_id: Option<String>,
    /// Narrow to a project
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub order: SortOrder,
}

impl ListRequest {
    pub fn page(&self) -> PageRequest {
        PageRequest {
            cursor: self.cursor.clone(),
            order: self.order,
            ..PageRequest::first(self.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        }
    }
}

/// Account search: equality on a few account columns within the caller's scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAccountsRequest {
    #[serde(flatten)]
    pub list: ListRequest,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub account_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    pub account_id: String,
    pub level: RoleLevel,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrgRequest {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Owning account; defaults to the caller
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgIdRequest {
    pub org_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrgRequest {
    pub org_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOrgResponse {
    pub org_id: String,
    pub deleted_projects: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProjectRequest {
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdRequest {
    pub project_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}
