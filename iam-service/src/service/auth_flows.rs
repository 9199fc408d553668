//! Credential flows: register, login, refresh, password reset, verification.

use iam_auth::{generate_token, tokens_match, Password, TokenPair, TokenType};
use iam_events::AccountEvent;
use iam_org::{Account, Claimant, RoleAssignment, RoleLevel};
use iam_rbac::QueryFilter;

use super::{already_exists, confirmed_password, normalize_email, IdentityService};
use crate::dto::{
    ApiResponse, ForgotPasswordRequest, LoginRequest, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse, RequestContext, ResetPasswordRequest,
    VerifyAccountRequest, VerifyAccountResponse,
};
use crate::endpoint::Endpoint;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Mutation, Row};

impl IdentityService {
    /// Create an unverified Guest account and mail its verification token.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        request: RegisterRequest,
    ) -> ApiResponse<RegisterResponse> {
        let result = self.register_inner(ctx, request).await;
        self.respond(Endpoint::Register, result, "Account registered")
    }

    async fn register_inner(
        &self,
        ctx: &RequestContext,
        request: RegisterRequest,
    ) -> ServiceResult<RegisterResponse> {
        self.caller(Endpoint::Register, ctx)?;

        let email = normalize_email(&request.email)?;
        let password = confirmed_password(&request.password, &request.password_confirm)?;

        let taken = self
            .store
            .accounts()
            .find(&QueryFilter::single("email", email.as_str()))
            .await?
            .is_some();
        if taken || self.superusers.find(&email).is_some() {
            return Err(ServiceError::AlreadyExists("account".to_string()));
        }

        let hash = self.hash_password(password).await?;
        let token = generate_token(iam_auth::credentials::TOKEN_LENGTH);

        let mut account = Account::new(email.clone(), hash);
        account.verification_token = Some(token.clone());
        let role = RoleAssignment::global(account.id.clone(), RoleLevel::Guest);
        let account_id = account.id.clone();

        self.store
            .bulk_exec(vec![
                Mutation::Insert(Row::Account(account)),
                Mutation::Insert(Row::Role(role)),
            ])
            .await
            .map_err(|e| already_exists(e.into(), "account"))?;

        tracing::info!(account_id = %account_id, "account registered");

        let (subject, content) = self.verification_mail(&account_id, &token);
        self.send_mail(subject, email.clone(), content).await;
        self.publish(
            AccountEvent::Registered {
                account_id: account_id.clone(),
                email,
            }
            .to_event(),
        )
        .await;

        Ok(RegisterResponse {
            account_id,
            verification_token: token,
        })
    }

    /// Exchange credentials for a token pair.
    ///
    /// Order is fixed: throttle check, credential check, token minting.
    pub async fn login(&self, ctx: &RequestContext, request: LoginRequest) -> ApiResponse<TokenPair> {
        let result = self.login_inner(ctx, request).await;
        self.respond(Endpoint::Login, result, "Logged in")
    }

    async fn login_inner(&self, ctx: &RequestContext, request: LoginRequest) -> ServiceResult<TokenPair> {
        self.caller(Endpoint::Login, ctx)?;

        let ip = ctx
            .client_ip()
            .ok_or_else(|| ServiceError::InvalidParameters("peer address unavailable".to_string()))?;
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ServiceError::InvalidParameters(
                "email and password are required".to_string(),
            ));
        }
        let email = request.email.trim().to_ascii_lowercase();
        let password = Password::new(request.password);

        self.throttle.check(&ip, &email).await?;

        let (mut account, stored) = match self
            .store
            .accounts()
            .find(&QueryFilter::single("email", email.as_str()))
            .await?
        {
            Some(account) => (account, true),
            None => match self.superusers.find(&email) {
                Some(superuser) => (superuser.account(), false),
                None => {
                    self.burn_password_check(password).await?;
                    self.throttle.record_failure(&ip, &email).await?;
                    return Err(ServiceError::InvalidCredentials);
                }
            },
        };

        if !self
            .verify_password(password, account.password_hash.clone())
            .await?
        {
            self.throttle.record_failure(&ip, &email).await?;
            tracing::info!(ip = %ip, "login failed: bad credentials");
            return Err(ServiceError::InvalidCredentials);
        }

        if account.disabled {
            return Err(ServiceError::AccountDisabled);
        }

        let roles = if stored {
            self.load_role(&account.id).await?.into_iter().collect()
        } else {
            vec![RoleAssignment::superadmin(account.id.clone())]
        };
        let claimant = Claimant::new(account.id.clone(), account.email.clone(), roles);
        let pair = self.tokens.new_token_pair(&claimant)?;

        if stored {
            account.mark_logged_in();
            self.store.accounts().update(account.clone()).await?;
        }

        self.publish(
            AccountEvent::LoggedIn {
                account_id: account.id.clone(),
                email: account.email.clone(),
                ip_address: ip.clone(),
            }
            .to_event(),
        )
        .await;

        self.throttle.record_success(&ip, &email).await?;

        tracing::info!(account_id = %account.id, superuser = !stored, "login succeeded");
        Ok(pair)
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_access_token(
        &self,
        ctx: &RequestContext,
        request: RefreshRequest,
    ) -> ApiResponse<RefreshResponse> {
        let result = self.refresh_inner(ctx, request);
        self.respond(Endpoint::RefreshAccessToken, result, "Access token renewed")
    }

    fn refresh_inner(&self, ctx: &RequestContext, request: RefreshRequest) -> ServiceResult<RefreshResponse> {
        self.caller(Endpoint::RefreshAccessToken, ctx)?;

        let claims = self
            .tokens
            .parse_token(&request.refresh_token, TokenType::Refresh)
            .map_err(|e| ServiceError::InvalidToken(e.to_string()))?;
        let access_token = self.tokens.renew_access_token(&claims)?;

        Ok(RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.config().access_token_duration.num_seconds(),
        })
    }

    /// Store a fresh reset token on the account and mail it.
    ///
    /// Answers the same way whether or not the email is known.
    pub async fn forgot_password(
        &self,
        ctx: &RequestContext,
        request: ForgotPasswordRequest,
    ) -> ApiResponse<()> {
        let result = self.forgot_password_inner(ctx, request).await;
        self.respond(
            Endpoint::ForgotPassword,
            result,
            "If the account exists, a reset token has been sent",
        )
    }

    async fn forgot_password_inner(
        &self,
        ctx: &RequestContext,
        request: ForgotPasswordRequest,
    ) -> ServiceResult<()> {
        self.caller(Endpoint::ForgotPassword, ctx)?;
        let email = normalize_email(&request.email)?;

        let Some(mut account) = self
            .store
            .accounts()
            .find(&QueryFilter::single("email", email.as_str()))
            .await?
        else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token(iam_auth::credentials::TOKEN_LENGTH);
        account.verification_token = Some(token.clone());
        account.touch();
        self.store.accounts().update(account).await?;

        let (subject, content) = self.reset_mail(&email, &token);
        self.send_mail(subject, email, content).await;
        Ok(())
    }

    /// Set a new password using the mailed token.
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        request: ResetPasswordRequest,
    ) -> ApiResponse<()> {
        let result = self.reset_password_inner(ctx, request).await;
        self.respond(Endpoint::ResetPassword, result, "Password updated")
    }

    async fn reset_password_inner(
        &self,
        ctx: &RequestContext,
        request: ResetPasswordRequest,
    ) -> ServiceResult<()> {
        self.caller(Endpoint::ResetPassword, ctx)?;
        let email = normalize_email(&request.email)?;
        let password = confirmed_password(&request.password, &request.password_confirm)?;

        // Unknown emails look like a token mismatch.
        let mut account = self
            .store
            .accounts()
            .find(&QueryFilter::single("email", email.as_str()))
            .await?
            .ok_or(ServiceError::VerificationTokenMismatch)?;

        let matches = account
            .verification_token
            .as_deref()
            .is_some_and(|expected| tokens_match(expected, &request.token));
        if !matches {
            return Err(ServiceError::VerificationTokenMismatch);
        }

        account.password_hash = self.hash_password(password).await?;
        account.verification_token = None;
        account.touch();
        let account_id = account.id.clone();
        self.store.accounts().update(account).await?;

        tracing::info!(account_id = %account_id, "password reset");
        self.publish(AccountEvent::PasswordReset { account_id }.to_event())
            .await;
        Ok(())
    }

    /// Confirm an account's email. Idempotent once verified.
    pub async fn verify_account(
        &self,
        ctx: &RequestContext,
        request: VerifyAccountRequest,
    ) -> ApiResponse<VerifyAccountResponse> {
        let result = self.verify_account_inner(ctx, request).await;
        self.respond(Endpoint::VerifyAccount, result, "Account verified")
    }

    async fn verify_account_inner(
        &self,
        ctx: &RequestContext,
        request: VerifyAccountRequest,
    ) -> ServiceResult<VerifyAccountResponse> {
        self.caller(Endpoint::VerifyAccount, ctx)?;
        let mut account = self.load_account(&request.account_id).await?;

        if account.verified {
            return Ok(VerifyAccountResponse {
                account_id: account.id,
                verified: true,
            });
        }

        let matches = account
            .verification_token
            .as_deref()
            .is_some_and(|expected| tokens_match(expected, &request.token));
        if !matches {
            return Err(ServiceError::VerificationTokenMismatch);
        }

        account.verified = true;
        account.verification_token = None;
        account.touch();
        let account_id = account.id.clone();
        self.store.accounts().update(account).await?;

        tracing::info!(account_id = %account_id, "account verified");
        self.publish(
            AccountEvent::Verified {
                account_id: account_id.clone(),
            }
            .to_event(),
        )
        .await;

        Ok(VerifyAccountResponse {
            account_id,
            verified: true,
        })
    }

    pub(super) fn verification_mail(&self, account_id: &str, token: &str) -> (String, String) {
        let mail = &self.config.mail;
        (
            format!("Verify your {} account", mail.product_name),
            format!(
                "Confirm your email address:\n{}/verify?account_id={}&token={}\n",
                mail.base_url, account_id, token
            ),
        )
    }

    fn reset_mail(&self, email: &str, token: &str) -> (String, String) {
        let mail = &self.config.mail;
        (
            format!("Reset your {} password", mail.product_name),
            format!(
                "A password reset was requested for {}.\nReset token: {}\n{}/reset-password?token={}\n",
                email, token, mail.base_url, token
            ),
        )
    }
}
