//! JWT token generation and validation
//!
//! This module provides the token manager: it mints access/refresh pairs
//! from a claimant, validates either kind, and renews access tokens from a
//! validated refresh token.
//!
//! Access and refresh tokens are signed with independent key material, so a
//! compromised access key cannot forge refresh tokens and vice versa.
//!
//! # Renewal trusts the snapshot
//!
//! [`TokenManager::renew_access_token`] copies the role snapshot embedded in
//! the refresh token. Roles are not re-read from storage at renewal; a role
//! change takes effect at the account's next login. Administrators who need
//! a change applied immediately must force a re-login.

use crate::claims::{TokenClaims, TokenType, DEFAULT_ISSUER};
use crate::error::{AuthError, AuthResult};
use chrono::Duration;
use iam_org::Claimant;
use serde::{Deserialize, Serialize};

use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};

/// Key material for one token family.
#[derive(Clone, Default)]
pub enum KeyMaterial {
    /// Nothing configured; [`TokenManager::new`] rejects it
    #[default]
    Missing,
    /// Shared secret for the HS* algorithms
    Secret(String),
    /// PEM pair for the RS*/ES* algorithms
    Pem {
        private_key: String,
        public_key: String,
    },
}

impl KeyMaterial {
    /// HMAC secret material.
    pub fn secret(secret: impl Into<String>) -> Self {
        KeyMaterial::Secret(secret.into())
    }

    /// PEM-encoded private/public key pair.
    pub fn pem(private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        KeyMaterial::Pem {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    /// `Secret` from an optional, possibly empty value.
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => KeyMaterial::Secret(secret),
            _ => KeyMaterial::Missing,
        }
    }

    /// Whether any key material is present.
    pub fn is_configured(&self) -> bool {
        !matches!(self, KeyMaterial::Missing)
    }

    fn load(&self, algorithm: JwtAlgorithm, family: TokenType) -> AuthResult<KeyPair> {
        let invalid = |what: &str, e: jsonwebtoken::errors::Error| {
            AuthError::ConfigError(format!("{} {} key: {}", family.as_str(), what, e))
        };

        match (algorithm.family(), self) {
            (KeyFamily::Hmac, KeyMaterial::Secret(secret)) if !secret.is_empty() => Ok(KeyPair {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            (KeyFamily::Rsa, KeyMaterial::Pem { private_key, public_key }) => Ok(KeyPair {
                encoding: EncodingKey::from_rsa_pem(private_key.as_bytes())
                    .map_err(|e| invalid("RSA private", e))?,
                decoding: DecodingKey::from_rsa_pem(public_key.as_bytes())
                    .map_err(|e| invalid("RSA public", e))?,
            }),
            (KeyFamily::Ec, KeyMaterial::Pem { private_key, public_key }) => Ok(KeyPair {
                encoding: EncodingKey::from_ec_pem(private_key.as_bytes())
                    .map_err(|e| invalid("EC private", e))?,
                decoding: DecodingKey::from_ec_pem(public_key.as_bytes())
                    .map_err(|e| invalid("EC public", e))?,
            }),
            (family_kind, _) => Err(AuthError::ConfigError(format!(
                "{:?} needs {} key material for {} tokens",
                algorithm,
                family_kind.expects(),
                family.as_str()
            ))),
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Missing => f.write_str("Missing"),
            KeyMaterial::Secret(_) => f.write_str("Secret([REDACTED])"),
            KeyMaterial::Pem { .. } => f.write_str("Pem([REDACTED])"),
        }
    }
}

/// Token lifetimes, issuer and key material.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Keys signing and verifying access tokens
    pub access_keys: KeyMaterial,

    /// Keys signing and verifying refresh tokens, independent of the access keys
    pub refresh_keys: KeyMaterial,

    /// Signing algorithm, shared by both families
    pub algorithm: JwtAlgorithm,

    /// `iss` claim set on issue and required on validation
    pub issuer: String,

    /// Access token lifetime (default: 15 minutes)
    pub access_token_duration: Duration,

    /// Refresh token lifetime (default: 7 days)
    pub refresh_token_duration: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_keys: KeyMaterial::Missing,
            refresh_keys: KeyMaterial::Missing,
            algorithm: JwtAlgorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(7),
        }
    }
}

/// Longest token lifetime [`TokenManager::new`] accepts (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Seconds from the environment. Values too large for a `Duration` become
/// `Duration::MAX` so validation rejects them instead of them being ignored.
fn env_seconds(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .map(|secs| Duration::try_seconds(secs).unwrap_or(Duration::MAX))
}

impl JwtConfig {
    /// HMAC configuration with one secret per token family.
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_keys: KeyMaterial::secret(access_secret),
            refresh_keys: KeyMaterial::secret(refresh_secret),
            ..Default::default()
        }
    }

    /// Check both lifetimes lie within `1..=MAX_TOKEN_TTL_SECS` seconds.
    pub fn validate(&self) -> AuthResult<()> {
        for (family, lifetime) in [
            (TokenType::Access, self.access_token_duration),
            (TokenType::Refresh, self.refresh_token_duration),
        ] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&lifetime.num_seconds()) {
                return Err(AuthError::ConfigError(format!(
                    "{} token lifetime must be between 1 and {} seconds",
                    family.as_str(),
                    MAX_TOKEN_TTL_SECS
                )));
            }
        }
        Ok(())
    }

    /// Read from the environment, falling back to the defaults.
    ///
    /// - `IAM_JWT_ACCESS_SECRET`, `IAM_JWT_REFRESH_SECRET`: HMAC secrets
    /// - `IAM_JWT_ISSUER`: token issuer (default: iam-core)
    /// - `IAM_JWT_ACCESS_TTL_SECS`: access lifetime (default: 900)
    /// - `IAM_JWT_REFRESH_TTL_SECS`: refresh lifetime (default: 604800)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            access_keys: KeyMaterial::from_secret(std::env::var("IAM_JWT_ACCESS_SECRET").ok()),
            refresh_keys: KeyMaterial::from_secret(std::env::var("IAM_JWT_REFRESH_SECRET").ok()),
            issuer: std::env::var("IAM_JWT_ISSUER").unwrap_or(default.issuer),
            access_token_duration: env_seconds("IAM_JWT_ACCESS_TTL_SECS")
                .unwrap_or(default.access_token_duration),
            refresh_token_duration: env_seconds("IAM_JWT_REFRESH_TTL_SECS")
                .unwrap_or(default.refresh_token_duration),
            ..default
        }
    }
}

/// Signing algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
    /// RSA PKCS#1 v1.5 with SHA-256
    RS256,
    /// ECDSA on P-256 with SHA-256
    ES256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Hmac,
    Rsa,
    Ec,
}

impl KeyFamily {
    fn expects(self) -> &'static str {
        match self {
            KeyFamily::Hmac => "non-empty secret",
            KeyFamily::Rsa => "RSA PEM",
            KeyFamily::Ec => "EC PEM",
        }
    }
}

impl JwtAlgorithm {
    fn family(self) -> KeyFamily {
        match self {
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => KeyFamily::Hmac,
            JwtAlgorithm::RS256 => KeyFamily::Rsa,
            JwtAlgorithm::ES256 => KeyFamily::Ec,
        }
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::ES256 => Algorithm::ES256,
        }
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Mints, validates and renews tokens.
pub struct TokenManager {
    config: JwtConfig,
    access: KeyPair,
    refresh: KeyPair,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &self.config.algorithm)
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// # Errors
    ///
    /// `ConfigError` when key material is missing or unparsable, when both
    /// families share the same HMAC secret, or when a lifetime is out of range.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        config.validate()?;
        if let (KeyMaterial::Secret(access), KeyMaterial::Secret(refresh)) =
            (&config.access_keys, &config.refresh_keys)
        {
            if access == refresh {
                return Err(AuthError::ConfigError(
                    "Access and refresh tokens must use independent secrets".to_string(),
                ));
            }
        }

        let access = config.access_keys.load(config.algorithm, TokenType::Access)?;
        let refresh = config.refresh_keys.load(config.algorithm, TokenType::Refresh)?;

        Ok(Self {
            config,
            access,
            refresh,
        })
    }

    /// HS256 with two secrets.
    pub fn with_secrets(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> AuthResult<Self> {
        Self::new(JwtConfig::with_secrets(access_secret, refresh_secret))
    }

    fn keys(&self, token_type: TokenType) -> &KeyPair {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    fn duration(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.config.access_token_duration,
            TokenType::Refresh => self.config.refresh_token_duration,
        }
    }

    /// Mint an access and a refresh token for a claimant.
    ///
    /// # Errors
    ///
    /// `TokenCreation` if signing fails.
    pub fn new_token_pair(&self, claimant: &Claimant) -> AuthResult<TokenPair> {
        let access = self.issue(claimant, TokenType::Access)?;
        let refresh = self.issue(claimant, TokenType::Refresh)?;

        Ok(TokenPair::new(
            access,
            refresh,
            self.config.access_token_duration.num_seconds(),
        ))
    }

    /// Mint a single token of the given kind.
    pub fn issue(&self, claimant: &Claimant, token_type: TokenType) -> AuthResult<String> {
        let claims = TokenClaims::new(
            claimant,
            token_type,
            self.config.issuer.clone(),
            self.duration(token_type),
        );
        self.encode_claims(&claims)
    }

    /// Encode existing claims with the key of their token kind.
    pub fn encode_claims(&self, claims: &TokenClaims) -> AuthResult<String> {
        let header = Header::new(self.config.algorithm.into());
        encode(&header, claims, &self.keys(claims.token_type).encoding)
            .map_err(|e| AuthError::TokenCreation(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token of the expected kind.
    ///
    /// # Errors
    ///
    /// - `TokenExpired` when past expiry (the caller may refresh)
    /// - `InvalidToken` for anything else: bad signature, malformed, wrong
    ///   issuer, or a token of the other kind
    pub fn parse_token(&self, token: &str, expected: TokenType) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(self.config.algorithm.into());
        validation.set_issuer(&[&self.config.issuer]);
        validation.validate_nbf = true;

        let token_data: TokenData<TokenClaims> =
            decode(token, &self.keys(expected).decoding, &validation).map_err(rejection)?;

        if token_data.claims.token_type != expected {
            return Err(AuthError::InvalidToken(format!(
                "Expected {} token",
                expected.as_str()
            )));
        }

        Ok(token_data.claims)
    }

    /// Mint a new access token from validated refresh claims.
    ///
    /// The identity and role snapshot are copied from `refresh_claims`
    /// unchanged; see the module docs.
    pub fn renew_access_token(&self, refresh_claims: &TokenClaims) -> AuthResult<String> {
        if refresh_claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken(
                "Only refresh tokens can renew access".to_string(),
            ));
        }
        self.issue(&refresh_claims.claimant(), TokenType::Access)
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

/// Why a presented token was refused. Only expiry is told apart.
fn rejection(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    let reason = match err.kind() {
        ErrorKind::ExpiredSignature => return AuthError::TokenExpired,
        ErrorKind::InvalidSignature => "signature mismatch",
        ErrorKind::InvalidIssuer => "unexpected issuer",
        ErrorKind::ImmatureSignature => "not yet valid",
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            "malformed"
        }
        _ => return AuthError::InvalidToken(err.to_string()),
    };
    AuthError::InvalidToken(reason.to_string())
}

/// Result of a successful login: both tokens plus the access lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token presented as `Authorization: Bearer`
    pub access_token: String,

    /// Long-lived token accepted only by RefreshAccessToken
    pub refresh_token: String,

    /// Always `"Bearer"`
    pub token_type: String,

    /// Seconds until the access token expires
    pub expires_in: i64,
}

impl TokenPair {
    /// Pair with the `Bearer` token type.
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
