//! Organization management.

use chrono::Utc;
use iam_events::OrgEvent;
use iam_org::Organization;
use iam_rbac::{Listing, Operation, QueryFilter, Target};

use super::{already_exists, require_non_empty, IdentityService};
use crate::dto::{
    ApiResponse, DeleteOrgResponse, ListRequest, NewOrgRequest, OrgIdRequest, RequestContext,
    UpdateOrgRequest,
};
use crate::endpoint::Endpoint;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Mutation, Page, PageRequest, Table, MAX_PAGE_SIZE};

impl IdentityService {
    /// Create an organization. Superadmin only.
    pub async fn new_org(
        &self,
        ctx: &RequestContext,
        request: NewOrgRequest,
    ) -> ApiResponse<Organization> {
        let result = self.new_org_inner(ctx, request).await;
        self.respond(Endpoint::NewOrg, result, "Organization created")
    }

    async fn new_org_inner(
        &self,
        ctx: &RequestContext,
        request: NewOrgRequest,
    ) -> ServiceResult<Organization> {
        let caller = self.require_caller(Endpoint::NewOrg, ctx)?;
        self.authorize(&caller, Operation::CreateOrg, &Target::none())?;
        require_non_empty("name", &request.name)?;

        let owner_id = match request.owner_id {
            Some(owner_id) if owner_id != caller.account_id => {
                self.load_account(&owner_id).await?.id
            }
            _ => caller.account_id.clone(),
        };

        let mut org = Organization::new(request.name.trim(), owner_id).with_contact(request.contact);
        org.logo_url = request.logo_url;

        self.store
            .orgs()
            .insert(org.clone())
            .await
            .map_err(|e| already_exists(e.into(), "organization"))?;

        tracing::info!(org_id = %org.id, name = %org.name, by = %caller.account_id, "organization created");
        self.publish(
            OrgEvent::Created {
                org_id: org.id.clone(),
                name: org.name.clone(),
            }
            .to_event(),
        )
        .await;

        Ok(org)
    }

    pub async fn get_org(&self, ctx: &RequestContext, request: OrgIdRequest) -> ApiResponse<Organization> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::GetOrg, ctx)?;
            self.authorize(&caller, Operation::ReadOrg, &Target::org(request.org_id.clone()))?;
            self.load_org(&request.org_id).await
        }
        .await;
        self.respond(Endpoint::GetOrg, result, "Organization found")
    }

    pub async fn list_orgs(
        &self,
        ctx: &RequestContext,
        request: ListRequest,
    ) -> ApiResponse<Page<Organization>> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::ListOrgs, ctx)?;
            let requested = Target {
                org_id: request.org_id.clone(),
                ..Target::none()
            };
            let filter = self
                .resolver
                .list_filter(Some(&caller), Listing::Orgs, &requested)?;
            Ok(self.store.orgs().list(&filter, &request.page()).await?)
        }
        .await;
        self.respond(Endpoint::ListOrgs, result, "Organizations listed")
    }

    pub async fn update_org(
        &self,
        ctx: &RequestContext,
        request: UpdateOrgRequest,
    ) -> ApiResponse<Organization> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::UpdateOrg, ctx)?;
            self.authorize(&caller, Operation::UpdateOrg, &Target::org(request.org_id.clone()))?;
            let mut org = self.load_org(&request.org_id).await?;

            if let Some(name) = &request.name {
                require_non_empty("name", name)?;
                org.name = name.trim().to_string();
            }
            if let Some(contact) = request.contact {
                org.contact = contact;
            }
            if let Some(logo_url) = request.logo_url {
                org.logo_url = Some(logo_url).filter(|url| !url.is_empty());
            }
            org.updated_at = Utc::now();

            self.store
                .orgs()
                .update(org.clone())
                .await
                .map_err(|e| already_exists(e.into(), "organization"))?;

            tracing::info!(org_id = %org.id, by = %caller.account_id, "organization updated");
            self.publish(OrgEvent::Updated { org_id: org.id.clone() }.to_event())
                .await;
            Ok(org)
        }
        .await;
        self.respond(Endpoint::UpdateOrg, result, "Organization updated")
    }

    /// Delete an organization and every project under it, atomically.
    pub async fn delete_org(
        &self,
        ctx: &RequestContext,
        request: OrgIdRequest,
    ) -> ApiResponse<DeleteOrgResponse> {
        let result = self.delete_org_inner(ctx, request).await;
        self.respond(Endpoint::DeleteOrg, result, "Organization deleted")
    }

    async fn delete_org_inner(
        &self,
        ctx: &RequestContext,
        request: OrgIdRequest,
    ) -> ServiceResult<DeleteOrgResponse> {
        let caller = self.require_caller(Endpoint::DeleteOrg, ctx)?;
        self.authorize(&caller, Operation::DeleteOrg, &Target::org(request.org_id.clone()))?;
        let org = self.load_org(&request.org_id).await?;

        let by_org = QueryFilter::single("org_id", org.id.as_str());
        let mut project_ids = Vec::new();
        let mut page = PageRequest::first(MAX_PAGE_SIZE);
        loop {
            let batch = self.store.projects().list(&by_org, &page).await?;
            project_ids.extend(batch.items.into_iter().map(|p| p.id));
            match batch.next_cursor {
                Some(cursor) => page = page.after(cursor),
                None => break,
            }
        }

        let mut mutations: Vec<Mutation> = project_ids
            .iter()
            .map(|id| Mutation::delete(Table::Projects, id.clone()))
            .collect();
        mutations.push(Mutation::delete(Table::Orgs, org.id.clone()));
        self.store.bulk_exec(mutations).await?;

        tracing::info!(
            org_id = %org.id,
            projects = project_ids.len(),
            by = %caller.account_id,
            "organization deleted"
        );
        self.publish(
            OrgEvent::Deleted {
                org_id: org.id.clone(),
                project_ids: project_ids.clone(),
            }
            .to_event(),
        )
        .await;

        Ok(DeleteOrgResponse {
            org_id: org.id,
            deleted_projects: project_ids,
        })
    }

    pub(super) async fn load_org(&self, org_id: &str) -> ServiceResult<Organization> {
        self.store
            .orgs()
            .find(&QueryFilter::single("id", org_id))
            .await?
            .ok_or_else(|| ServiceError::NotFound("organization".to_string()))
    }
}
