//! The identity service façade.
//!
//! Orchestrates the token manager, login throttle, resolver and the
//! collaborators. Each public operation authenticates the call through the
//! token gateway, consults the resolver before touching data, and answers
//! with an [`ApiResponse`].

mod accounts;
mod auth_flows;
mod orgs;
mod projects;

use std::sync::Arc;

use iam_auth::{Password, PasswordHasherService, TokenGateway, TokenManager};
use iam_events::{Event, EventBus, MemoryEventBus};
use iam_org::{Account, Claimant, RoleAssignment};
use iam_rbac::{QueryFilter, Resolver, Target};

use crate::config::{ConfigError, ServiceConfig};
use crate::dto::{ApiResponse, RequestContext};
use crate::endpoint::Endpoint;
use crate::error::{ServiceError, ServiceResult};
use crate::mailer::{LogMailer, Mailer};
use crate::side_effects::{Outcome, SideEffects};
use crate::store::Store;
use crate::superusers::SuperuserSource;
use crate::throttle::LoginThrottle;

/// Multi-tenant identity and authorization service.
pub struct IdentityService {
    config: ServiceConfig,
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    events: Arc<dyn EventBus>,
    superusers: Arc<SuperuserSource>,
    tokens: Arc<TokenManager>,
    gateway: TokenGateway,
    resolver: Resolver,
    throttle: LoginThrottle,
    hasher: Arc<PasswordHasherService>,
    side_effects: SideEffects,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("tokens", &self.tokens)
            .field("throttle", &self.throttle)
            .field("superusers", &self.superusers.len())
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    /// Build the service over a store.
    ///
    /// Mail goes to the log and events to an in-memory bus until replaced
    /// with [`with_mailer`](Self::with_mailer) / [`with_events`](Self::with_events).
    /// Superusers are loaded from `config.superusers_file` when set.
    pub fn new(config: ServiceConfig, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        config.validate()?;

        let tokens = Arc::new(TokenManager::new(config.jwt.clone()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "jwt".to_string(),
                message: e.to_string(),
            }
        })?);
        let hasher = PasswordHasherService::new(config.password_hashing).map_err(|e| {
            ConfigError::InvalidValue {
                key: "password_hashing".to_string(),
                message: e.to_string(),
            }
        })?;
        let superusers = match &config.superusers_file {
            Some(path) => SuperuserSource::from_file(path)?,
            None => SuperuserSource::empty(),
        };

        tracing::info!(
            public_operations = config.public_operations.len(),
            superusers = superusers.len(),
            ban_threshold = config.throttle.ban_threshold,
            "identity service configured"
        );

        Ok(Self {
            gateway: TokenGateway::new(tokens.clone(), config.public_operations.clone()),
            throttle: LoginThrottle::new(store.clone(), config.throttle),
            side_effects: SideEffects::new(config.side_effect_wait),
            resolver: Resolver::new(),
            mailer: Arc::new(LogMailer),
            events: Arc::new(MemoryEventBus::new()),
            superusers: Arc::new(superusers),
            hasher: Arc::new(hasher),
            tokens,
            store,
            config,
        })
    }

    /// Replace the mailer.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Replace the event bus.
    pub fn with_events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Replace the superuser source.
    pub fn with_superusers(mut self, superusers: SuperuserSource) -> Self {
        self.superusers = Arc::new(superusers);
        self
    }

    /// Replace the resolver (custom rule table).
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Authenticate a call. `None` for public endpoints.
    fn caller(&self, endpoint: Endpoint, ctx: &RequestContext) -> ServiceResult<Option<Claimant>> {
        let claims = self
            .gateway
            .authenticate(endpoint.as_str(), ctx.authorization.as_deref())?;
        Ok(claims.map(|c| c.claimant()))
    }

    /// Authenticate a call that needs an identity.
    fn require_caller(&self, endpoint: Endpoint, ctx: &RequestContext) -> ServiceResult<Claimant> {
        self.caller(endpoint, ctx)?
            .ok_or_else(|| ServiceError::Unauthenticated("endpoint requires an identity".to_string()))
    }

    /// Ask the resolver.
    fn authorize(
        &self,
        caller: &Claimant,
        op: iam_rbac::Operation,
        target: &Target,
    ) -> ServiceResult<()> {
        self.resolver.authorize(Some(caller), op, target)?;
        Ok(())
    }

    /// Convert a flow result into the response envelope, logging failures.
    fn respond<T>(
        &self,
        endpoint: Endpoint,
        result: ServiceResult<T>,
        message: &str,
    ) -> ApiResponse<T> {
        match result {
            Ok(data) => ApiResponse::ok(message, data),
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(endpoint = %endpoint, error = %err, "request failed");
                } else {
                    tracing::debug!(endpoint = %endpoint, reason = ?err.reason(), "request rejected");
                }
                ApiResponse::from_error(&err)
            }
        }
    }

    async fn hash_password(&self, password: Password) -> ServiceResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(ServiceError::from)
    }

    async fn verify_password(&self, password: Password, hash: String) -> ServiceResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {}", e)))
    }

    async fn burn_password_check(&self, password: Password) -> ServiceResult<()> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {}", e)))
    }

    /// Best-effort mail.
    async fn send_mail(&self, subject: String, recipient: String, content: String) -> Outcome {
        let mailer = self.mailer.clone();
        self.side_effects
            .dispatch("mail", async move {
                let recipients = [recipient];
                mailer.send_mail(&subject, &recipients, &content).await
            })
            .await
    }

    /// Best-effort event.
    async fn publish(&self, event: Event) -> Outcome {
        let events = self.events.clone();
        self.side_effects
            .dispatch("event", async move { events.publish(event).await })
            .await
    }

    async fn load_account(&self, account_id: &str) -> ServiceResult<Account> {
        self.store
            .accounts()
            .find(&QueryFilter::single("id", account_id))
            .await?
            .ok_or(ServiceError::AccountNotFound)
    }

    async fn load_role(&self, account_id: &str) -> ServiceResult<Option<RoleAssignment>> {
        Ok(self
            .store
            .roles()
            .find(&QueryFilter::single("account_id", account_id))
            .await?)
    }
}

/// Trim and lowercase an email, rejecting obviously malformed ones.
fn normalize_email(email: &str) -> ServiceResult<String> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(' ') => {
            Ok(email)
        }
        _ => Err(ServiceError::InvalidParameters("invalid email".to_string())),
    }
}

/// Require a non-empty password equal to its confirmation.
fn confirmed_password(password: &str, confirm: &str) -> ServiceResult<Password> {
    if password.is_empty() {
        return Err(ServiceError::InvalidParameters("password is required".to_string()));
    }
    if password != confirm {
        return Err(ServiceError::InvalidParameters("passwords do not match".to_string()));
    }
    Ok(Password::new(password))
}

fn require_non_empty(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidParameters(format!("{} is required", field)));
    }
    Ok(())
}

/// Name a unique-key conflict after the record kind.
fn already_exists(err: ServiceError, kind: &str) -> ServiceError {
    match err {
        ServiceError::AlreadyExists(_) => ServiceError::AlreadyExists(kind.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
        assert!(normalize_email("nope").is_err());
        assert!(normalize_email("@x.com").is_err());
        assert!(normalize_email("a b@x.com").is_err());
    }

    #[test]
    fn test_confirmed_password() {
        assert!(confirmed_password("pw", "pw").is_ok());
        assert!(matches!(
            confirmed_password("pw", "px"),
            Err(ServiceError::InvalidParameters(_))
        ));
        assert!(confirmed_password("", "").is_err());
    }
}
