//! Project domain models
//!
//! Projects live inside exactly one organization. Deleting a project never
//! touches its organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project within an organization.
///
/// # Examples
///
/// ```
/// use iam_org::Project;
///
/// let project = Project::new("org-1", "Marketing Docs", "owner-1");
/// assert_eq!(project.org_id, "org-1");
/// assert_eq!(project.name, "Marketing Docs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier for the project
    pub id: String,

    /// Human-readable name (unique)
    pub name: String,

    /// Organization this project belongs to
    pub org_id: String,

    /// Account that owns the project
    pub owner_id: String,

    /// Logo reference
    pub logo_url: Option<String>,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new project.
    ///
    /// # Arguments
    ///
    /// * `org_id` - The parent organization
    /// * `name` - Project name (must be unique)
    /// * `owner_id` - Account that owns the project
    pub fn new(
        org_id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            org_id: org_id.into(),
            owner_id: owner_id.into(),
            logo_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the logo reference.
    pub fn with_logo(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_creation() {
        let project = Project::new("org", "Docs", "owner").with_logo("logo.png");

        assert_eq!(project.org_id, "org");
        assert_eq!(project.owner_id, "owner");
        assert_eq!(project.logo_url.as_deref(), Some("logo.png"));
    }
}
