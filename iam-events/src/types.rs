//! Domain event types
//!
//! This module defines the envelope every IAM event travels in and the
//! typed events each module emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Module an event originates from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Accounts and credentials
    Account,
    /// Organizations
    Org,
    /// Projects
    Project,
}

impl Module {
    /// Topic prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Account => "account",
            Module::Org => "org",
            Module::Project => "project",
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event envelope: routing topic, tenant context and a JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type within its module (e.g., "logged_in", "deleted")
    pub event_type: String,

    /// Source module
    pub source: Module,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization context
    pub org_id: Option<String>,

    /// Project context
    pub project_id: Option<String>,

    /// Account that triggered the event
    pub account_id: Option<String>,

    /// Event payload
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event.
    pub fn new(event_type: impl Into<String>, source: Module, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            source,
            timestamp: Utc::now(),
            org_id: None,
            project_id: None,
            account_id: None,
            payload,
        }
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Set project context.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set account context.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Topic for this event: `{source}.{event_type}`.
    pub fn topic(&self) -> String {
        format!("{}.{}", self.source.as_str(), self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

fn payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Account lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    /// Account was registered
    Registered { account_id: String, email: String },
    /// Account logged in
    LoggedIn {
        account_id: String,
        email: String,
        ip_address: String,
    },
    /// Account confirmed its e-mail
    Verified { account_id: String },
    /// Password was reset through the forgot-password flow
    PasswordReset { account_id: String },
    /// Account was disabled
    Disabled { account_id: String },
    /// Account was deleted
    Deleted { account_id: String },
    /// Role assignment changed
    RoleAssigned {
        account_id: String,
        level: String,
        org_id: Option<String>,
        project_id: Option<String>,
    },
}

impl AccountEvent {
    fn account_id(&self) -> &str {
        match self {
            AccountEvent::Registered { account_id, .. }
            | AccountEvent::LoggedIn { account_id, .. }
            | AccountEvent::Verified { account_id }
            | AccountEvent::PasswordReset { account_id }
            | AccountEvent::Disabled { account_id }
            | AccountEvent::Deleted { account_id }
            | AccountEvent::RoleAssigned { account_id, .. } => account_id,
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        let event_type = match self {
            AccountEvent::Registered { .. } => "registered",
            AccountEvent::LoggedIn { .. } => "logged_in",
            AccountEvent::Verified { .. } => "verified",
            AccountEvent::PasswordReset { .. } => "password_reset",
            AccountEvent::Disabled { .. } => "disabled",
            AccountEvent::Deleted { .. } => "deleted",
            AccountEvent::RoleAssigned { .. } => "role_assigned",
        };
        Event::new(event_type, Module::Account, payload(self)).with_account(self.account_id())
    }
}

/// Organization lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrgEvent {
    /// Organization was created
    Created { org_id: String, name: String },
    /// Organization was updated
    Updated { org_id: String },
    /// Organization and its projects were deleted
    Deleted {
        org_id: String,
        project_ids: Vec<String>,
    },
}

impl OrgEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        let (event_type, org_id) = match self {
            OrgEvent::Created { org_id, .. } => ("created", org_id),
            OrgEvent::Updated { org_id } => ("updated", org_id),
            OrgEvent::Deleted { org_id, .. } => ("deleted", org_id),
        };
        Event::new(event_type, Module::Org, payload(self)).with_org(org_id.clone())
    }
}

/// Project lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    /// Project was created
    Created {
        project_id: String,
        org_id: String,
        name: String,
    },
    /// Project was updated
    Updated { project_id: String, org_id: String },
    /// Project was deleted
    Deleted { project_id: String, org_id: String },
}

impl ProjectEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        let (event_type, project_id, org_id) = match self {
            ProjectEvent::Created { project_id, org_id, .. } => ("created", project_id, org_id),
            ProjectEvent::Updated { project_id, org_id } => ("updated", project_id, org_id),
            ProjectEvent::Deleted { project_id, org_id } => ("deleted", project_id, org_id),
        };
        Event::new(event_type, Module::Project, payload(self))
            .with_org(org_id.clone())
            .with_project(project_id.clone())
    }
}
