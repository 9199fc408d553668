//! Login throttle
//!
//! Failed logins are counted per origin IP. Once the count reaches the
//! threshold a ban window opens; while the count is above the threshold and
//! the window is open, logins from that IP are refused before credentials
//! are looked at. A successful login clears the IP's row.
//!
//! The IP always comes from the transport peer address, never from the
//! request body. Each step is one atomic read-modify-write on the store, so
//! the throttle itself holds no lock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use iam_org::LoginAttempt;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// Longest ban window `ServiceConfig::validate` accepts (one year).
pub const MAX_BAN_SECS: i64 = 365 * 24 * 60 * 60;

/// Ban policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Failures before a ban window opens
    pub ban_threshold: u32,
    /// Length of the ban window in seconds
    pub ban_duration_secs: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            ban_threshold: 5,
            ban_duration_secs: 3600,
        }
    }
}

impl ThrottlePolicy {
    /// Ban window length. Out-of-range values saturate.
    pub fn ban_duration(&self) -> Duration {
        Duration::try_seconds(self.ban_duration_secs).unwrap_or(Duration::MAX)
    }
}

/// Per-IP login throttle.
#[derive(Clone)]
pub struct LoginThrottle {
    store: Arc<dyn Store>,
    policy: ThrottlePolicy,
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("policy", &self.policy)
            .finish()
    }
}

impl LoginThrottle {
    pub fn new(store: Arc<dyn Store>, policy: ThrottlePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Refuse the attempt if `ip` is banned.
    pub async fn check(&self, ip: &str, email: &str) -> ServiceResult<()> {
        self.check_at(ip, email, Utc::now()).await
    }

    /// [`check`](Self::check) against an explicit clock.
    pub async fn check_at(&self, ip: &str, email: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let email_owned = email.to_string();
        let row = self
            .store
            .login_attempts()
            .upsert_with(
                ip,
                LoginAttempt::new(ip, email),
                Box::new(move |row| {
                    row.email = email_owned;
                    row.updated_at = now;
                }),
            )
            .await?;

        if row.is_banned(self.policy.ban_threshold, now) {
            tracing::warn!(
                ip,
                attempts = row.total_attempts,
                ban_until = row.ban_until,
                "login refused: ip is banned"
            );
            return Err(ServiceError::TooManyAttempts {
                retry_after: row.ban_until.saturating_sub(now.timestamp()),
            });
        }
        Ok(())
    }

    /// Count a failed credential check.
    pub async fn record_failure(&self, ip: &str, email: &str) -> ServiceResult<LoginAttempt> {
        self.record_failure_at(ip, email, Utc::now()).await
    }

    /// [`record_failure`](Self::record_failure) against an explicit clock.
    pub async fn record_failure_at(
        &self,
        ip: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<LoginAttempt> {
        let policy = self.policy;
        let email_owned = email.to_string();
        let row = self
            .store
            .login_attempts()
            .upsert_with(
                ip,
                LoginAttempt::new(ip, email),
                Box::new(move |row| {
                    row.email = email_owned;
                    row.register_failure(policy.ban_threshold, policy.ban_duration(), now);
                }),
            )
            .await?;

        tracing::debug!(ip, attempts = row.total_attempts, "login failure recorded");
        Ok(row)
    }

    /// Clear the IP's counters after a successful login.
    pub async fn record_success(&self, ip: &str, email: &str) -> ServiceResult<()> {
        let email_owned = email.to_string();
        self.store
            .login_attempts()
            .upsert_with(
                ip,
                LoginAttempt::new(ip, email),
                Box::new(move |row| {
                    row.email = email_owned;
                    row.reset();
                }),
            )
            .await?;
        Ok(())
    }
}
