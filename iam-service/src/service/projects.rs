//! Project management.

use chrono::Utc;
use iam_events::ProjectEvent;
use iam_org::Project;
use iam_rbac::{Listing, Operation, QueryFilter, Target};

use super::{already_exists, require_non_empty, IdentityService};
use crate::dto::{
    ApiResponse, ListRequest, NewProjectRequest, ProjectIdRequest, RequestContext,
    UpdateProjectRequest,
};
use crate::endpoint::Endpoint;
use crate::error::{ServiceError, ServiceResult};
use crate::store::Page;

impl IdentityService {
    /// Create a project inside an existing organization.
    pub async fn new_project(
        &self,
        ctx: &RequestContext,
        request: NewProjectRequest,
    ) -> ApiResponse<Project> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::NewProject, ctx)?;
            self.authorize(&caller, Operation::CreateProject, &Target::org(request.org_id.clone()))?;
            require_non_empty("name", &request.name)?;
            let org = self.load_org(&request.org_id).await?;

            let mut project = Project::new(org.id, request.name.trim(), caller.account_id.clone());
            project.logo_url = request.logo_url;

            self.store
                .projects()
                .insert(project.clone())
                .await
                .map_err(|e| already_exists(e.into(), "project"))?;

            tracing::info!(
                project_id = %project.id,
                org_id = %project.org_id,
                by = %caller.account_id,
                "project created"
            );
            self.publish(
                ProjectEvent::Created {
                    project_id: project.id.clone(),
                    org_id: project.org_id.clone(),
                    name: project.name.clone(),
                }
                .to_event(),
            )
            .await;
            Ok(project)
        }
        .await;
        self.respond(Endpoint::NewProject, result, "Project created")
    }

    pub async fn get_project(
        &self,
        ctx: &RequestContext,
        request: ProjectIdRequest,
    ) -> ApiResponse<Project> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::GetProject, ctx)?;
            let project = self.load_project(&request.project_id).await?;
            self.authorize(&caller, Operation::ReadProject, &project_target(&project))?;
            Ok(project)
        }
        .await;
        self.respond(Endpoint::GetProject, result, "Project found")
    }

    pub async fn list_projects(
        &self,
        ctx: &RequestContext,
        request: ListRequest,
    ) -> ApiResponse<Page<Project>> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::ListProjects, ctx)?;
            let requested = Target {
                org_id: request.org_id.clone(),
                project_id: request.project_id.clone(),
                ..Target::none()
            };
            let filter = self
                .resolver
                .list_filter(Some(&caller), Listing::Projects, &requested)?;
            Ok(self.store.projects().list(&filter, &request.page()).await?)
        }
        .await;
        self.respond(Endpoint::ListProjects, result, "Projects listed")
    }

    pub async fn update_project(
        &self,
        ctx: &RequestContext,
        request: UpdateProjectRequest,
    ) -> ApiResponse<Project> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::UpdateProject, ctx)?;
            let mut project = self.load_project(&request.project_id).await?;
            self.authorize(&caller, Operation::UpdateProject, &project_target(&project))?;

            if let Some(name) = &request.name {
                require_non_empty("name", name)?;
                project.name = name.trim().to_string();
            }
            if let Some(logo_url) = request.logo_url {
                project.logo_url = Some(logo_url).filter(|url| !url.is_empty());
            }
            project.updated_at = Utc::now();

            self.store
                .projects()
                .update(project.clone())
                .await
                .map_err(|e| already_exists(e.into(), "project"))?;

            tracing::info!(project_id = %project.id, by = %caller.account_id, "project updated");
            self.publish(
                ProjectEvent::Updated {
                    project_id: project.id.clone(),
                    org_id: project.org_id.clone(),
                }
                .to_event(),
            )
            .await;
            Ok(project)
        }
        .await;
        self.respond(Endpoint::UpdateProject, result, "Project updated")
    }

    /// Delete a single project. The organization is untouched.
    pub async fn delete_project(
        &self,
        ctx: &RequestContext,
        request: ProjectIdRequest,
    ) -> ApiResponse<()> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::DeleteProject, ctx)?;
            let project = self.load_project(&request.project_id).await?;
            self.authorize(&caller, Operation::DeleteProject, &project_target(&project))?;

            self.store.projects().delete(&project.id).await?;

            tracing::info!(
                project_id = %project.id,
                org_id = %project.org_id,
                by = %caller.account_id,
                "project deleted"
            );
            self.publish(
                ProjectEvent::Deleted {
                    project_id: project.id,
                    org_id: project.org_id,
                }
                .to_event(),
            )
            .await;
            Ok(())
        }
        .await;
        self.respond(Endpoint::DeleteProject, result, "Project deleted")
    }

    async fn load_project(&self, project_id: &str) -> ServiceResult<Project> {
        self.store
            .projects()
            .find(&QueryFilter::single("id", project_id))
            .await?
            .ok_or_else(|| ServiceError::NotFound("project".to_string()))
    }
}

fn project_target(project: &Project) -> Target {
    Target::project(project.org_id.clone(), project.id.clone())
}
