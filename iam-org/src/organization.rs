//! Organization domain models
//!
//! Organizations are the top-level tenant entities that contain projects.
//! Only a Superadmin creates them, and deleting one cascades to its projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact information published for an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Contact email
    pub email: Option<String>,

    /// Contact phone number
    pub phone: Option<String>,

    /// Primary website URL
    pub website_url: Option<String>,
}

/// An organization represents a tenant in the multi-tenant system.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Projects (deleted with the org)
///   └─ Role assignments scoped to the org
/// ```
///
/// # Examples
///
/// ```
/// use iam_org::Organization;
///
/// let org = Organization::new("Acme Corp", "owner-1");
/// assert_eq!(org.name, "Acme Corp");
/// assert_eq!(org.owner_id, "owner-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: String,

    /// Human-readable name (unique across the platform)
    pub name: String,

    /// Contact details
    #[serde(default)]
    pub contact: ContactInfo,

    /// Account that owns the organization
    pub owner_id: String,

    /// Logo reference for branding
    pub logo_url: Option<String>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization.
    ///
    /// # Arguments
    ///
    /// * `name` - The organization name (must be unique)
    /// * `owner_id` - The account that owns this organization
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            contact: ContactInfo::default(),
            owner_id: owner_id.into(),
            logo_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set contact details.
    pub fn with_contact(mut self, contact: ContactInfo) -> Self {
        self.contact = contact;
        self
    }

    /// Set the logo reference.
    pub fn with_logo(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }
}
