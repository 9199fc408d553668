//! Credential flows through the façade: registration, login, throttling,
//! token renewal, password reset and verification.

mod common;

use std::time::Duration;

use chrono::Utc;
use iam_auth::TokenType;
use iam_events::EventBus;
use iam_org::RoleLevel;
use iam_rbac::QueryFilter;
use iam_service::dto::{
    AccountIdRequest, AssignRoleRequest, ForgotPasswordRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, VerifyAccountRequest,
};
use iam_service::{ErrorReason, MailError, RequestContext, Store};

use common::{fails_with, ok, peer, TestFixture, PASSWORD, ROOT_EMAIL, ROOT_PASSWORD};

#[tokio::test]
async fn test_register_then_login() {
    let fx = TestFixture::new();
    let registered = fx.register("alice@example.com").await;

    let pair = ok(fx.login("Alice@Example.com ", PASSWORD).await);
    assert_eq!(pair.token_type, "Bearer");

    let claims = fx
        .service
        .tokens()
        .parse_token(&pair.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(claims.sub, registered.account_id);
    assert_eq!(claims.roles.len(), 1);
    assert_eq!(claims.roles[0].level, RoleLevel::Guest);

    let account = fx
        .store
        .accounts()
        .get_by_id(&registered.account_id)
        .await
        .unwrap();
    assert!(account.last_login.is_some());
    assert!(!account.verified);
    assert!(account.password_hash.starts_with("$argon2"));
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let fx = TestFixture::new();
    fx.register("bob@example.com").await;
    let ctx = peer("192.0.2.1:1000");

    let request = |email: &str, confirm: &str| RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        password_confirm: confirm.to_string(),
    };

    fails_with(
        fx.service.register(&ctx, request("bob@example.com", PASSWORD)).await,
        ErrorReason::AlreadyExists,
    );
    fails_with(
        fx.service.register(&ctx, request(ROOT_EMAIL, PASSWORD)).await,
        ErrorReason::AlreadyExists,
    );
    fails_with(
        fx.service.register(&ctx, request("carol@example.com", "different")).await,
        ErrorReason::InvalidParameters,
    );
    fails_with(
        fx.service.register(&ctx, request("not-an-email", PASSWORD)).await,
        ErrorReason::InvalidParameters,
    );
}

#[tokio::test]
async fn test_register_sends_verification_mail() {
    let fx = TestFixture::new();
    let registered = fx.register("dave@example.com").await;

    let mail = fx.mailer.last_to("dave@example.com").await.unwrap();
    assert!(mail.content.contains(&registered.verification_token));
    assert!(mail.content.contains(&registered.account_id));
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_register() {
    let fx = TestFixture::new();
    fx.mailer
        .fail_with(Some(MailError::Unavailable("smtp down".into())))
        .await;

    let registered = fx.register("erin@example.com").await;
    assert!(fx.mailer.sent().await.is_empty());
    assert!(fx
        .store
        .accounts()
        .get_by_id(&registered.account_id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_wrong_password_counts_failure() {
    let fx = TestFixture::new();
    fx.register("frank@example.com").await;

    fails_with(
        fx.login_from("198.51.100.20:4000", "frank@example.com", "wrong").await,
        ErrorReason::InvalidCredentials,
    );

    let row = fx
        .store
        .login_attempts()
        .get_by_id("198.51.100.20")
        .await
        .unwrap();
    assert_eq!(row.total_attempts, 1);
    assert_eq!(row.email, "frank@example.com");
    assert_eq!(row.ban_until, 0);
}

#[tokio::test]
async fn test_unknown_email_looks_like_wrong_password() {
    let fx = TestFixture::new();
    fx.register("grace@example.com").await;

    let unknown = fx
        .login_from("198.51.100.21:4000", "nobody@example.com", PASSWORD)
        .await;
    let wrong = fx
        .login_from("198.51.100.21:4000", "grace@example.com", "wrong")
        .await;

    assert_eq!(unknown.error_reason, Some(ErrorReason::InvalidCredentials));
    assert_eq!(unknown.message, wrong.message);

    let row = fx
        .store
        .login_attempts()
        .get_by_id("198.51.100.21")
        .await
        .unwrap();
    assert_eq!(row.total_attempts, 2);
}

#[tokio::test]
async fn test_login_requires_peer_address() {
    let fx = TestFixture::new();
    fx.register("heidi@example.com").await;

    let response = fx
        .service
        .login(
            &RequestContext::default(),
            iam_service::dto::LoginRequest {
                email: "heidi@example.com".into(),
                password: PASSWORD.into(),
            },
        )
        .await;
    fails_with(response, ErrorReason::InvalidParameters);
}

#[tokio::test]
async fn test_throttle_bans_after_six_failures() {
    let fx = TestFixture::new();
    fx.register("ivan@example.com").await;
    let addr = "203.0.113.50:9000";

    for _ in 0..6 {
        fails_with(
            fx.login_from(addr, "ivan@example.com", "wrong").await,
            ErrorReason::InvalidCredentials,
        );
    }

    // Banned even with the right password.
    fails_with(
        fx.login_from(addr, "ivan@example.com", PASSWORD).await,
        ErrorReason::TooManyAttempts,
    );

    // Other addresses are unaffected.
    ok(fx.login_from("203.0.113.51:9000", "ivan@example.com", PASSWORD).await);

    // Once the window has passed the address may log in again.
    let mut row = fx
        .store
        .login_attempts()
        .get_by_id("203.0.113.50")
        .await
        .unwrap();
    row.ban_until = Utc::now().timestamp() - 1;
    fx.store.login_attempts().upsert(row).await.unwrap();

    ok(fx.login_from(addr, "ivan@example.com", PASSWORD).await);

    let row = fx
        .store
        .login_attempts()
        .get_by_id("203.0.113.50")
        .await
        .unwrap();
    assert_eq!((row.total_attempts, row.ban_until), (0, 0));
}

#[tokio::test]
async fn test_successful_login_resets_counter() {
    let fx = TestFixture::new();
    fx.register("judy@example.com").await;
    let addr = "203.0.113.60:9000";

    for _ in 0..4 {
        fx.login_from(addr, "judy@example.com", "wrong").await;
    }
    ok(fx.login_from(addr, "judy@example.com", PASSWORD).await);

    // A fresh budget: six more failures before the ban applies.
    for _ in 0..6 {
        fails_with(
            fx.login_from(addr, "judy@example.com", "wrong").await,
            ErrorReason::InvalidCredentials,
        );
    }
    fails_with(
        fx.login_from(addr, "judy@example.com", PASSWORD).await,
        ErrorReason::TooManyAttempts,
    );
}

#[tokio::test]
async fn test_superuser_login_is_not_stored() {
    let fx = TestFixture::new();

    let pair = ok(fx.login(ROOT_EMAIL, ROOT_PASSWORD).await);
    let claims = fx
        .service
        .tokens()
        .parse_token(&pair.access_token, TokenType::Access)
        .unwrap();
    assert!(claims.claimant().is_superadmin());

    let stored = fx
        .store
        .accounts()
        .find(&QueryFilter::single("email", ROOT_EMAIL))
        .await
        .unwrap();
    assert!(stored.is_none());

    fails_with(fx.login(ROOT_EMAIL, "wrong").await, ErrorReason::InvalidCredentials);
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in() {
    let fx = TestFixture::new();
    let registered = fx.register("mallory@example.com").await;
    let root = fx.root().await;

    ok(fx
        .service
        .disable_account(
            &root,
            AccountIdRequest {
                account_id: registered.account_id,
            },
        )
        .await);

    fails_with(
        fx.login("mallory@example.com", PASSWORD).await,
        ErrorReason::AccountDisabled,
    );
}

#[tokio::test]
async fn test_login_publishes_event() {
    let fx = TestFixture::new();
    let registered = fx.register("niaj@example.com").await;
    let mut subscription = fx.events.subscribe("account.logged_in").await.unwrap();

    ok(fx.login_from("198.51.100.99:1234", "niaj@example.com", PASSWORD).await);

    let event = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.account_id.as_deref(), Some(registered.account_id.as_str()));
    assert_eq!(event.payload["ip_address"], "198.51.100.99");
}

#[tokio::test]
async fn test_renewed_token_keeps_role_snapshot() {
    let fx = TestFixture::new();
    let registered = fx.register("olivia@example.com").await;
    let pair = ok(fx.login("olivia@example.com", PASSWORD).await);

    let org = fx.create_org("Snapshot Org").await;
    let root = fx.root().await;
    ok(fx
        .service
        .assign_account_to_role(
            &root,
            AssignRoleRequest {
                account_id: registered.account_id.clone(),
                level: RoleLevel::Admin,
                org_id: Some(org.id.clone()),
                project_id: None,
            },
        )
        .await);

    let renewed = ok(fx
        .service
        .refresh_access_token(
            &peer("192.0.2.1:1000"),
            RefreshRequest {
                refresh_token: pair.refresh_token.clone(),
            },
        )
        .await);
    assert_eq!(renewed.token_type, "Bearer");

    let claims = fx
        .service
        .tokens()
        .parse_token(&renewed.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(claims.roles.len(), 1);
    assert_eq!(claims.roles[0].level, RoleLevel::Guest);
    assert_eq!(claims.roles[0].org_id, None);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let fx = TestFixture::new();
    fx.register("peggy@example.com").await;
    let pair = ok(fx.login("peggy@example.com", PASSWORD).await);

    let response = fx
        .service
        .refresh_access_token(
            &peer("192.0.2.1:1000"),
            RefreshRequest {
                refresh_token: pair.access_token,
            },
        )
        .await;
    fails_with(response, ErrorReason::InvalidToken);

    let response = fx
        .service
        .refresh_access_token(
            &peer("192.0.2.1:1000"),
            RefreshRequest {
                refresh_token: "garbage".into(),
            },
        )
        .await;
    fails_with(response, ErrorReason::InvalidToken);
}

#[tokio::test]
async fn test_verify_account_is_idempotent() {
    let fx = TestFixture::new();
    let registered = fx.register("rupert@example.com").await;
    let ctx = peer("192.0.2.1:1000");
    let request = || VerifyAccountRequest {
        account_id: registered.account_id.clone(),
        token: registered.verification_token.clone(),
    };

    let first = ok(fx.service.verify_account(&ctx, request()).await);
    let second = ok(fx.service.verify_account(&ctx, request()).await);
    assert!(first.verified);
    assert!(second.verified);

    let account = fx
        .store
        .accounts()
        .get_by_id(&registered.account_id)
        .await
        .unwrap();
    assert!(account.verified);
    assert!(account.verification_token.is_none());
}

#[tokio::test]
async fn test_verify_account_rejects_wrong_token() {
    let fx = TestFixture::new();
    let registered = fx.register("sybil@example.com").await;

    let response = fx
        .service
        .verify_account(
            &peer("192.0.2.1:1000"),
            VerifyAccountRequest {
                account_id: registered.account_id.clone(),
                token: "not-the-token".into(),
            },
        )
        .await;
    fails_with(response, ErrorReason::VerificationTokenMismatch);

    let response = fx
        .service
        .verify_account(
            &peer("192.0.2.1:1000"),
            VerifyAccountRequest {
                account_id: "missing".into(),
                token: registered.verification_token,
            },
        )
        .await;
    fails_with(response, ErrorReason::AccountNotFound);
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let fx = TestFixture::new();
    fx.register("trent@example.com").await;
    let ctx = peer("192.0.2.1:1000");

    ok(fx
        .service
        .forgot_password(
            &ctx,
            ForgotPasswordRequest {
                email: "trent@example.com".into(),
            },
        )
        .await);

    let token = fx
        .store
        .accounts()
        .find(&QueryFilter::single("email", "trent@example.com"))
        .await
        .unwrap()
        .unwrap()
        .verification_token
        .unwrap();
    let mail = fx.mailer.last_to("trent@example.com").await.unwrap();
    assert!(mail.content.contains(&token));

    let reset = |token: &str| ResetPasswordRequest {
        email: "trent@example.com".into(),
        token: token.to_string(),
        password: "a brand new secret".into(),
        password_confirm: "a brand new secret".into(),
    };

    fails_with(
        fx.service.reset_password(&ctx, reset("guess")).await,
        ErrorReason::VerificationTokenMismatch,
    );
    ok(fx.service.reset_password(&ctx, reset(&token)).await);

    // The token is single use.
    fails_with(
        fx.service.reset_password(&ctx, reset(&token)).await,
        ErrorReason::VerificationTokenMismatch,
    );

    fails_with(
        fx.login("trent@example.com", PASSWORD).await,
        ErrorReason::InvalidCredentials,
    );
    ok(fx.login("trent@example.com", "a brand new secret").await);
}

#[tokio::test]
async fn test_forgot_password_does_not_enumerate() {
    let fx = TestFixture::new();
    let ctx = peer("192.0.2.1:1000");

    let response = fx
        .service
        .forgot_password(
            &ctx,
            ForgotPasswordRequest {
                email: "ghost@example.com".into(),
            },
        )
        .await;
    assert!(response.success);
    assert!(fx.mailer.sent().await.is_empty());

    let response = fx
        .service
        .reset_password(
            &ctx,
            ResetPasswordRequest {
                email: "ghost@example.com".into(),
                token: "anything".into(),
                password: "x".into(),
                password_confirm: "x".into(),
            },
        )
        .await;
    fails_with(response, ErrorReason::VerificationTokenMismatch);
}

#[tokio::test]
async fn test_protected_endpoint_requires_token() {
    let fx = TestFixture::new();
    let registered = fx.register("uma@example.com").await;
    let request = || AccountIdRequest {
        account_id: registered.account_id.clone(),
    };

    fails_with(
        fx.service.get_account(&peer("192.0.2.1:1000"), request()).await,
        ErrorReason::Unauthenticated,
    );
    fails_with(
        fx.service
            .get_account(&peer("192.0.2.1:1000").with_bearer("forged"), request())
            .await,
        ErrorReason::InvalidToken,
    );

    // A refresh token is not an access token.
    let pair = ok(fx.login("uma@example.com", PASSWORD).await);
    fails_with(
        fx.service
            .get_account(&peer("192.0.2.1:1000").with_bearer(&pair.refresh_token), request())
            .await,
        ErrorReason::InvalidToken,
    );
}
