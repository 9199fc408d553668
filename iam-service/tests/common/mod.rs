//! Shared fixture for the façade integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use iam_auth::{HashParams, JwtConfig, Password, PasswordHasherService, TokenPair};
use iam_events::MemoryEventBus;
use iam_org::{Organization, Project, RoleLevel};
use iam_service::dto::{
    AssignRoleRequest, LoginRequest, NewOrgRequest, NewProjectRequest, RegisterRequest,
    RegisterResponse,
};
use iam_service::{
    ApiResponse, ErrorReason, IdentityService, MemoryMailer, MemoryStore, RequestContext,
    ServiceConfig, Superuser, SuperuserSource,
};

pub const ROOT_EMAIL: &str = "root@iam.test";
pub const ROOT_PASSWORD: &str = "root-password";
pub const PASSWORD: &str = "correct horse battery";

/// A service over in-memory collaborators, with one bootstrap superuser.
pub struct TestFixture {
    pub service: IdentityService,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub events: Arc<MemoryEventBus>,
}

impl TestFixture {
    pub fn new() -> Self {
        let config = ServiceConfig {
            jwt: JwtConfig::with_secrets("test-access-secret", "test-refresh-secret"),
            password_hashing: HashParams::insecure_fast(),
            side_effect_wait: Duration::from_secs(1),
            ..Default::default()
        };

        let hasher = PasswordHasherService::new(HashParams::insecure_fast()).unwrap();
        let root = Superuser {
            email: ROOT_EMAIL.to_string(),
            password_hash: hasher.hash(&Password::new(ROOT_PASSWORD)).unwrap(),
            avatar_url: None,
        };

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let events = Arc::new(MemoryEventBus::new());

        let service = IdentityService::new(config, store.clone())
            .unwrap()
            .with_mailer(mailer.clone())
            .with_events(events.clone())
            .with_superusers(SuperuserSource::new(vec![root]));

        Self {
            service,
            store,
            mailer,
            events,
        }
    }

    /// Register `email` and return the response payload.
    pub async fn register(&self, email: &str) -> RegisterResponse {
        let response = self
            .service
            .register(
                &peer("192.0.2.1:1000"),
                RegisterRequest {
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                    password_confirm: PASSWORD.to_string(),
                },
            )
            .await;
        ok(response)
    }

    /// Log in from a fixed address.
    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<TokenPair> {
        self.login_from("192.0.2.1:1000", email, password).await
    }

    pub async fn login_from(&self, addr: &str, email: &str, password: &str) -> ApiResponse<TokenPair> {
        self.service
            .login(
                &peer(addr),
                LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
    }

    /// Authenticated context for `email`.
    pub async fn session(&self, email: &str, password: &str) -> RequestContext {
        let pair = ok(self.login(email, password).await);
        peer("192.0.2.1:1000").with_bearer(&pair.access_token)
    }

    pub async fn root(&self) -> RequestContext {
        self.session(ROOT_EMAIL, ROOT_PASSWORD).await
    }

    pub async fn create_org(&self, name: &str) -> Organization {
        let root = self.root().await;
        ok(self
            .service
            .new_org(
                &root,
                NewOrgRequest {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await)
    }

    pub async fn create_project(&self, org_id: &str, name: &str) -> Project {
        let root = self.root().await;
        ok(self
            .service
            .new_project(
                &root,
                NewProjectRequest {
                    org_id: org_id.to_string(),
                    name: name.to_string(),
                    logo_url: None,
                },
            )
            .await)
    }

    /// Register `email`, have root assign it a role, and log it in.
    pub async fn member(
        &self,
        email: &str,
        level: RoleLevel,
        org_id: Option<&str>,
        project_id: Option<&str>,
    ) -> (String, RequestContext) {
        let account_id = self.register(email).await.account_id;
        let root = self.root().await;
        ok(self
            .service
            .assign_account_to_role(
                &root,
                AssignRoleRequest {
                    account_id: account_id.clone(),
                    level,
                    org_id: org_id.map(str::to_string),
                    project_id: project_id.map(str::to_string),
                },
            )
            .await);
        (account_id, self.session(email, PASSWORD).await)
    }
}

pub fn peer(addr: &str) -> RequestContext {
    let addr: SocketAddr = addr.parse().unwrap();
    RequestContext::from_peer(addr)
}

/// Unwrap a successful response.
#[track_caller]
pub fn ok<T: std::fmt::Debug>(response: ApiResponse<T>) -> T {
    assert!(response.success, "expected success, got {:?}", response);
    response.data.unwrap()
}

/// Assert a failed response with `reason`.
#[track_caller]
pub fn fails_with<T: std::fmt::Debug>(response: ApiResponse<T>, reason: ErrorReason) {
    assert!(!response.success, "expected failure, got {:?}", response);
    assert_eq!(response.error_reason, Some(reason), "{}", response.message);
}
