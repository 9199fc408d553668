//! Account management.

use iam_auth::generate_token;
use iam_events::AccountEvent;
use iam_org::{Account, RoleAssignment, RoleLevel, Scope};
use iam_rbac::{Listing, Operation, QueryFilter, Target};

use super::{already_exists, confirmed_password, normalize_email, IdentityService};
use crate::dto::{
    AccountIdRequest, AccountView, ApiResponse, AssignRoleRequest, ListRequest, RequestContext,
    SearchAccountsRequest, UpdateAccountRequest,
};
use crate::endpoint::Endpoint;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{cursor_of, Mutation, Page, PageRequest, Record, Table};

impl IdentityService {
    pub async fn get_account(
        &self,
        ctx: &RequestContext,
        request: AccountIdRequest,
    ) -> ApiResponse<AccountView> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::GetAccount, ctx)?;
            if let Some(superuser) = self.superusers.find_by_account_id(&request.account_id) {
                let target = Target::account(superuser.account_id(), &Scope::Global);
                self.authorize(&caller, Operation::ReadAccount, &target)?;
                return Ok(AccountView::new(superuser.account(), Some(superuser.role())));
            }
            let (account, role, target) = self.account_target(&request.account_id).await?;
            self.authorize(&caller, Operation::ReadAccount, &target)?;
            Ok(AccountView::new(account, role))
        }
        .await;
        self.respond(Endpoint::GetAccount, result, "Account found")
    }

    /// Accounts within the caller's scope, paged through the role table.
    pub async fn list_accounts(
        &self,
        ctx: &RequestContext,
        request: ListRequest,
    ) -> ApiResponse<Page<AccountView>> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::ListAccounts, ctx)?;
            let filter = self.resolver.list_filter(
                Some(&caller),
                Listing::Accounts,
                &requested_scope(&request),
            )?;
            self.collect_accounts(&filter, &QueryFilter::new(), request.page())
                .await
        }
        .await;
        self.respond(Endpoint::ListAccounts, result, "Accounts listed")
    }

    /// Equality search on email, verified and disabled within the caller's scope.
    pub async fn search_accounts(
        &self,
        ctx: &RequestContext,
        request: SearchAccountsRequest,
    ) -> ApiResponse<Page<AccountView>> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::SearchAccounts, ctx)?;
            let filter = self.resolver.list_filter(
                Some(&caller),
                Listing::Accounts,
                &requested_scope(&request.list),
            )?;

            let mut account_filter = QueryFilter::new();
            if let Some(email) = &request.email {
                account_filter.insert("email", email.trim().to_ascii_lowercase());
            }
            if let Some(verified) = request.verified {
                account_filter.insert("verified", verified.to_string());
            }
            if let Some(disabled) = request.disabled {
                account_filter.insert("disabled", disabled.to_string());
            }

            self.collect_accounts(&filter, &account_filter, request.list.page())
                .await
        }
        .await;
        self.respond(Endpoint::SearchAccounts, result, "Accounts found")
    }

    /// Update profile fields. A new email must be verified again.
    pub async fn update_account(
        &self,
        ctx: &RequestContext,
        request: UpdateAccountRequest,
    ) -> ApiResponse<AccountView> {
        let result = self.update_account_inner(ctx, request).await;
        self.respond(Endpoint::UpdateAccount, result, "Account updated")
    }

    async fn update_account_inner(
        &self,
        ctx: &RequestContext,
        request: UpdateAccountRequest,
    ) -> ServiceResult<AccountView> {
        let caller = self.require_caller(Endpoint::UpdateAccount, ctx)?;
        let (mut account, role, target) = self.account_target(&request.account_id).await?;
        self.authorize(&caller, Operation::UpdateAccount, &target)?;

        let mut new_token = None;
        if let Some(email) = &request.email {
            let email = normalize_email(email)?;
            if email != account.email {
                if self.superusers.find(&email).is_some() {
                    return Err(ServiceError::AlreadyExists("account".to_string()));
                }
                let token = generate_token(iam_auth::credentials::TOKEN_LENGTH);
                account.email = email;
                account.verified = false;
                account.verification_token = Some(token.clone());
                new_token = Some(token);
            }
        }
        if let Some(avatar_url) = request.avatar_url {
            account.avatar_url = Some(avatar_url).filter(|url| !url.is_empty());
        }
        if let Some(password) = &request.password {
            let confirm = request.password_confirm.as_deref().unwrap_or_default();
            let password = confirmed_password(password, confirm)?;
            account.password_hash = self.hash_password(password).await?;
        }

        account.touch();
        self.store
            .accounts()
            .update(account.clone())
            .await
            .map_err(|e| already_exists(e.into(), "account"))?;

        tracing::info!(
            account_id = %account.id,
            email_changed = new_token.is_some(),
            "account updated"
        );

        if let Some(token) = new_token {
            let (subject, content) = self.verification_mail(&account.id, &token);
            self.send_mail(subject, account.email.clone(), content).await;
        }

        Ok(AccountView::new(account, role))
    }

    pub async fn disable_account(
        &self,
        ctx: &RequestContext,
        request: AccountIdRequest,
    ) -> ApiResponse<AccountView> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::DisableAccount, ctx)?;
            let (mut account, role, target) = self.account_target(&request.account_id).await?;
            self.authorize(&caller, Operation::DisableAccount, &target)?;

            if !account.disabled {
                account.disabled = true;
                account.touch();
                self.store.accounts().update(account.clone()).await?;

                tracing::info!(account_id = %account.id, by = %caller.account_id, "account disabled");
                self.publish(
                    AccountEvent::Disabled {
                        account_id: account.id.clone(),
                    }
                    .to_event(),
                )
                .await;
            }
            Ok(AccountView::new(account, role))
        }
        .await;
        self.respond(Endpoint::DisableAccount, result, "Account disabled")
    }

    /// Remove the account together with its role assignment.
    pub async fn delete_account(
        &self,
        ctx: &RequestContext,
        request: AccountIdRequest,
    ) -> ApiResponse<()> {
        let result: ServiceResult<_> = async {
            let caller = self.require_caller(Endpoint::DeleteAccount, ctx)?;
            let (account, _, target) = self.account_target(&request.account_id).await?;
            self.authorize(&caller, Operation::DeleteAccount, &target)?;

            self.store
                .bulk_exec(vec![
                    Mutation::delete(Table::Accounts, account.id.clone()),
                    Mutation::delete_if_exists(Table::Roles, account.id.clone()),
                ])
                .await?;

            tracing::info!(account_id = %account.id, by = %caller.account_id, "account deleted");
            self.publish(AccountEvent::Deleted { account_id: account.id }.to_event())
                .await;
            Ok(())
        }
        .await;
        self.respond(Endpoint::DeleteAccount, result, "Account deleted")
    }

    /// Overwrite the account's single role assignment.
    pub async fn assign_account_to_role(
        &self,
        ctx: &RequestContext,
        request: AssignRoleRequest,
    ) -> ApiResponse<RoleAssignment> {
        let result = self.assign_role_inner(ctx, request).await;
        self.respond(Endpoint::AssignAccountToRole, result, "Role assigned")
    }

    async fn assign_role_inner(
        &self,
        ctx: &RequestContext,
        request: AssignRoleRequest,
    ) -> ServiceResult<RoleAssignment> {
        let caller = self.require_caller(Endpoint::AssignAccountToRole, ctx)?;
        let AssignRoleRequest {
            account_id,
            level,
            org_id,
            project_id,
        } = request;

        if level == RoleLevel::Superadmin && (org_id.is_some() || project_id.is_some()) {
            return Err(ServiceError::InvalidParameters(
                "superadmin cannot be scoped".to_string(),
            ));
        }
        if project_id.is_some() && org_id.is_none() {
            return Err(ServiceError::InvalidParameters(
                "project scope requires org_id".to_string(),
            ));
        }

        let grant = Target::role_grant(account_id.clone(), level, org_id.clone(), project_id.clone());
        self.authorize(&caller, Operation::AssignRole, &grant)?;

        let account = self.load_account(&account_id).await?;
        if let Some(org_id) = &org_id {
            self.store
                .orgs()
                .find(&QueryFilter::single("id", org_id.as_str()))
                .await?
                .ok_or_else(|| ServiceError::NotFound("organization".to_string()))?;
        }
        if let (Some(org_id), Some(project_id)) = (&org_id, &project_id) {
            let project = self
                .store
                .projects()
                .find(&QueryFilter::single("id", project_id.as_str()))
                .await?
                .ok_or_else(|| ServiceError::NotFound("project".to_string()))?;
            if &project.org_id != org_id {
                return Err(ServiceError::InvalidParameters(
                    "project does not belong to org".to_string(),
                ));
            }
        }

        // The caller must also control the role being replaced, unless it is
        // an unaffiliated Guest/Member.
        let existing = self.load_role(&account.id).await?;
        if let Some(current) = &existing {
            let unaffiliated = current.scope() == Scope::Global && current.level < RoleLevel::Admin;
            if !unaffiliated {
                let mut target = Target::account_with_role(current);
                target.role_level = Some(current.level);
                self.authorize(&caller, Operation::AssignRole, &target)?;
            }
        }

        let role = match existing {
            Some(mut role) => {
                role.reassign(level, org_id, project_id);
                role
            }
            None => RoleAssignment {
                org_id,
                project_id,
                ..RoleAssignment::global(account.id.clone(), level)
            },
        };
        self.store.roles().upsert(role.clone()).await?;

        tracing::info!(
            account_id = %role.account_id,
            level = %role.level,
            by = %caller.account_id,
            "role assigned"
        );
        self.publish(
            AccountEvent::RoleAssigned {
                account_id: role.account_id.clone(),
                level: role.level.as_str().to_string(),
                org_id: role.org_id.clone(),
                project_id: role.project_id.clone(),
            }
            .to_event(),
        )
        .await;

        Ok(role)
    }

    /// Load an account with its role and the target it presents to the resolver.
    async fn account_target(
        &self,
        account_id: &str,
    ) -> ServiceResult<(Account, Option<RoleAssignment>, Target)> {
        let account = self.load_account(account_id).await?;
        let role = self.load_role(&account.id).await?;
        let target = match &role {
            Some(role) => Target::account_with_role(role),
            None => Target::account(account.id.clone(), &Scope::Global),
        };
        Ok((account, role, target))
    }

    /// Walk role rows matching `scope`, join their accounts and keep those
    /// matching `accounts`, until the page is full.
    async fn collect_accounts(
        &self,
        scope: &QueryFilter,
        accounts: &QueryFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<AccountView>> {
        let limit = page.limit;
        let mut items = Vec::with_capacity(limit);
        let mut request = page;

        loop {
            let batch = self.store.roles().list(scope, &request).await?;
            let last_batch = batch.next_cursor.is_none();
            let batch_len = batch.items.len();

            for (index, role) in batch.items.into_iter().enumerate() {
                let cursor = cursor_of(&role);
                let Some(account) = self
                    .store
                    .accounts()
                    .find(&QueryFilter::single("id", role.account_id.as_str()))
                    .await?
                else {
                    continue;
                };
                if !account.matches(accounts) {
                    continue;
                }

                items.push(AccountView::new(account, Some(role)));
                if items.len() == limit {
                    let more = !last_batch || index + 1 < batch_len;
                    return Ok(Page {
                        items,
                        next_cursor: more.then_some(cursor),
                    });
                }
            }

            match batch.next_cursor {
                Some(cursor) => request = request.after(cursor),
                None => {
                    return Ok(Page {
                        items,
                        next_cursor: None,
                    })
                }
            }
        }
    }
}

fn requested_scope(request: &ListRequest) -> Target {
    Target {
        org_id: request.org_id.clone(),
        project_id: request.project_id.clone(),
        ..Target::none()
    }
}
