//! JWT claims carried by access and refresh tokens
//!
//! A claim set is a value: it is built once at issuance from a claimant and
//! never mutated afterwards. Renewal builds a new claim set from the old
//! snapshot.

use chrono::{DateTime, Duration, Utc};
use iam_org::{Claimant, RoleAssignment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default token issuer.
pub const DEFAULT_ISSUER: &str = "iam-core";

/// Claims embedded in every token.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use iam_auth::claims::{TokenClaims, TokenType};
/// use iam_org::{Claimant, RoleAssignment};
///
/// let claimant = Claimant::new("acc-1", "a@x.com", vec![RoleAssignment::superadmin("acc-1")]);
/// let claims = TokenClaims::new(&claimant, TokenType::Access, "iam-core", Duration::minutes(15));
/// assert_eq!(claims.claimant(), claimant);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account ID
    pub sub: String,
    pub iss: String,
    /// Unix seconds
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    /// Unique per token, renewal included
    pub jti: String,

    /// Account email
    pub email: String,

    /// Role snapshot as of issuance
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,

    /// Token kind
    pub token_type: TokenType,
}

impl TokenClaims {
    /// Build claims for a claimant.
    ///
    /// # Arguments
    ///
    /// * `claimant` - Identity and role snapshot
    /// * `token_type` - Access or refresh
    /// * `issuer` - Issuer string checked on validation
    /// * `duration` - Token validity duration
    pub fn new(
        claimant: &Claimant,
        token_type: TokenType,
        issuer: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        let exp = now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            sub: claimant.account_id.clone(),
            iss: issuer.into(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            email: claimant.email.clone(),
            roles: claimant.roles.clone(),
            token_type,
        }
    }

    /// The identity and role snapshot embedded in the token.
    pub fn claimant(&self) -> Claimant {
        Claimant::new(self.sub.clone(), self.email.clone(), self.roles.clone())
    }

    /// Account ID.
    pub fn account_id(&self) -> &str {
        &self.sub
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Seconds of validity left.
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Which key family signed a token; the two are never interchangeable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[default]
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_org::RoleLevel;

    fn claimant() -> Claimant {
        Claimant::new(
            "acc",
            "test@example.com",
            vec![RoleAssignment::org("acc", RoleLevel::Member, "org")],
        )
    }

    #[test]
    fn test_claims_creation() {
        let claims = TokenClaims::new(&claimant(), TokenType::Refresh, DEFAULT_ISSUER, Duration::days(7));

        assert_eq!(claims.account_id(), "acc");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(!claims.is_expired());
        assert!(claims.expires_in() > 0);
    }

    #[test]
    fn test_claims_expiration() {
        let mut claims = TokenClaims::new(&claimant(), TokenType::Access, DEFAULT_ISSUER, Duration::hours(1));
        claims.exp = Utc::now().timestamp() - 3600;

        assert!(claims.is_expired());
        assert_eq!(claims.expires_in(), 0);
    }

    #[test]
    fn test_each_token_has_unique_id() {
        let a = TokenClaims::new(&claimant(), TokenType::Access, DEFAULT_ISSUER, Duration::hours(1));
        let b = TokenClaims::new(&claimant(), TokenType::Access, DEFAULT_ISSUER, Duration::hours(1));
        assert_ne!(a.jti, b.jti);
    }
}
