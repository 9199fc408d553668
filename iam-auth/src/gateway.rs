//! Request authentication in front of the façade
//!
//! The gateway turns an inbound `Authorization` value into validated access
//! claims. Operations named in the public allow-list skip validation
//! entirely; the list is configuration supplied at construction.

use std::collections::HashSet;
use std::sync::Arc;

use crate::claims::{TokenClaims, TokenType};
use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenManager;

/// Scheme prefix of an `Authorization` value.
const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from a `Bearer <token>` value.
///
/// The scheme is matched case-insensitively; surrounding whitespace is
/// ignored.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let value = authorization.trim();
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

/// Validates access tokens for every non-public operation.
#[derive(Debug, Clone)]
pub struct TokenGateway {
    tokens: Arc<TokenManager>,
    public_operations: HashSet<String>,
}

impl TokenGateway {
    /// Create a gateway over a token manager and a public allow-list.
    pub fn new<I, S>(tokens: Arc<TokenManager>, public_operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens,
            public_operations: public_operations.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `operation` bypasses token validation.
    pub fn is_public(&self, operation: &str) -> bool {
        self.public_operations.contains(operation)
    }

    /// The token manager behind this gateway.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Authenticate a call.
    ///
    /// Returns `Ok(None)` for public operations, `Ok(Some(claims))` for a
    /// valid access token.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when no bearer token is present
    /// - `TokenExpired` / `InvalidToken` from validation
    pub fn authenticate(
        &self,
        operation: &str,
        authorization: Option<&str>,
    ) -> AuthResult<Option<TokenClaims>> {
        if self.is_public(operation) {
            return Ok(None);
        }

        let token = authorization
            .and_then(bearer_token)
            .ok_or_else(|| AuthError::Unauthenticated("Missing bearer token".to_string()))?;

        match self.tokens.parse_token(token, TokenType::Access) {
            Ok(claims) => Ok(Some(claims)),
            Err(e) => {
                tracing::debug!(operation, error = %e, "rejected access token");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_org::{Claimant, RoleAssignment, RoleLevel};

    fn gateway() -> TokenGateway {
        let tokens = TokenManager::with_secrets("gateway-access-secret", "gateway-refresh-secret").unwrap();
        TokenGateway::new(Arc::new(tokens), ["Login", "Register"])
    }

    fn claimant() -> Claimant {
        Claimant::new("acc-1", "a@x.com", vec![RoleAssignment::global("acc-1", RoleLevel::Member)])
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_public_operation_skips_validation() {
        let gateway = gateway();
        assert!(gateway.is_public("Login"));
        assert_eq!(gateway.authenticate("Login", None), Ok(None));
        assert_eq!(gateway.authenticate("Register", Some("Bearer garbage")), Ok(None));
    }

    #[test]
    fn test_missing_token() {
        let result = gateway().authenticate("GetAccount", None);
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn test_access_token_accepted() {
        let gateway = gateway();
        let pair = gateway.tokens().new_token_pair(&claimant()).unwrap();
        let header = format!("Bearer {}", pair.access_token);

        let claims = gateway.authenticate("GetAccount", Some(&header)).unwrap().unwrap();
        assert_eq!(claims.claimant(), claimant());
    }

    #[test]
    fn test_refresh_token_rejected() {
        let gateway = gateway();
        let pair = gateway.tokens().new_token_pair(&claimant()).unwrap();
        let header = format!("Bearer {}", pair.refresh_token);

        assert!(matches!(
            gateway.authenticate("GetAccount", Some(&header)),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
