//! Per-IP login attempt counters
//!
//! One row per origin IP, upserted on every login attempt and reset on a
//! successful login.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failed-login bookkeeping for a single origin IP.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use iam_org::LoginAttempt;
///
/// let now = Utc::now();
/// let mut attempt = LoginAttempt::new("10.0.0.1", "a@x.com");
/// for _ in 0..6 {
///     attempt.register_failure(5, Duration::hours(1), now);
/// }
/// assert!(attempt.is_banned(5, now));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Origin IP address (row key)
    pub ip_address: String,

    /// Email used on the most recent attempt
    pub email: String,

    /// Failures since the last successful login
    pub total_attempts: u32,

    /// Unix seconds until which the IP is banned, 0 when not banned
    pub ban_until: i64,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last written
    pub updated_at: DateTime<Utc>,
}

impl LoginAttempt {
    /// Fresh, unbanned row.
    pub fn new(ip_address: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            ip_address: ip_address.into(),
            email: email.into(),
            total_attempts: 0,
            ban_until: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a login from this IP must be refused before looking at
    /// credentials.
    ///
    /// Banned only while `total_attempts > threshold` and the ban window has
    /// not elapsed.
    pub fn is_banned(&self, threshold: u32, now: DateTime<Utc>) -> bool {
        self.total_attempts > threshold && self.ban_until != 0 && self.ban_until >= now.timestamp()
    }

    /// Count a failed credential check, opening a ban window once the count
    /// reaches `threshold`.
    pub fn register_failure(&mut self, threshold: u32, ban_duration: Duration, now: DateTime<Utc>) {
        self.total_attempts = self.total_attempts.saturating_add(1);
        self.ban_until = if self.total_attempts >= threshold {
            now
                .checked_add_signed(ban_duration)
                .map_or(i64::MAX, |until| until.timestamp())
        } else {
            0
        };
        self.updated_at = now;
    }

    /// Clear counters after a successful login.
    pub fn reset(&mut self) {
        self.total_attempts = 0;
        self.ban_until = 0;
        self.updated_at = Utc::now();
    }

    /// Ban expiry as a timestamp, if a ban is set.
    pub fn banned_until(&self) -> Option<DateTime<Utc>> {
        if self.ban_until == 0 {
            None
        } else {
            DateTime::from_timestamp(self.ban_until, 0)
        }
    }
}
