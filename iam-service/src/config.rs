//! Service configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development. Token secrets have no defaults and must be provided.

use std::path::PathBuf;
use std::time::Duration;

use iam_auth::{HashParams, JwtConfig, MAX_TOKEN_TTL_SECS};
use thiserror::Error;

use crate::endpoint::Endpoint;
use crate::side_effects::DEFAULT_SIDE_EFFECT_WAIT;
use crate::throttle::{ThrottlePolicy, MAX_BAN_SECS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Outbound mail settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Product name used in subjects.
    pub product_name: String,

    /// Base URL links in mails point to.
    pub base_url: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            product_name: "IAM".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Configuration of the identity service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Token signing configuration.
    pub jwt: JwtConfig,

    /// Endpoint names that bypass token validation.
    pub public_operations: Vec<String>,

    /// Login throttle policy.
    pub throttle: ThrottlePolicy,

    /// JSON file listing bootstrap superusers.
    pub superusers_file: Option<PathBuf>,

    /// How long a call waits for a side effect to report an error.
    pub side_effect_wait: Duration,

    /// Password hashing cost.
    pub password_hashing: HashParams,

    /// Mail settings.
    pub mail: MailSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            public_operations: Endpoint::PUBLIC.iter().map(|e| e.as_str().to_string()).collect(),
            throttle: ThrottlePolicy::default(),
            superusers_file: None,
            side_effect_wait: DEFAULT_SIDE_EFFECT_WAIT,
            password_hashing: HashParams::default(),
            mail: MailSettings::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `IAM_JWT_*`: see [`JwtConfig::from_env`]
    /// - `IAM_PUBLIC_OPERATIONS`: Comma-separated endpoint names (default: the
    ///   registration, login, password and verification flows)
    /// - `IAM_THROTTLE_BAN_THRESHOLD`: Failures before a ban (default: 5)
    /// - `IAM_THROTTLE_BAN_SECS`: Ban window in seconds (default: 3600)
    /// - `IAM_SUPERUSERS_FILE`: Path to the superuser JSON file
    /// - `IAM_SIDE_EFFECT_WAIT_MS`: Side effect wait in ms (default: 50)
    /// - `IAM_ARGON2_MEMORY_KIB`, `IAM_ARGON2_ITERATIONS`, `IAM_ARGON2_PARALLELISM`
    /// - `IAM_MAIL_PRODUCT_NAME`: Product name in mail subjects (default: IAM)
    /// - `IAM_MAIL_BASE_URL`: Base URL for mail links (default: http://localhost:8080)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            jwt: JwtConfig::from_env(),
            public_operations: std::env::var("IAM_PUBLIC_OPERATIONS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(default.public_operations),
            throttle: ThrottlePolicy {
                ban_threshold: env_parse("IAM_THROTTLE_BAN_THRESHOLD")
                    .unwrap_or(default.throttle.ban_threshold),
                ban_duration_secs: env_parse("IAM_THROTTLE_BAN_SECS")
                    .unwrap_or(default.throttle.ban_duration_secs),
            },
            superusers_file: std::env::var("IAM_SUPERUSERS_FILE").ok().map(PathBuf::from),
            side_effect_wait: env_parse("IAM_SIDE_EFFECT_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.side_effect_wait),
            password_hashing: HashParams {
                memory_kib: env_parse("IAM_ARGON2_MEMORY_KIB")
                    .unwrap_or(default.password_hashing.memory_kib),
                iterations: env_parse("IAM_ARGON2_ITERATIONS")
                    .unwrap_or(default.password_hashing.iterations),
                parallelism: env_parse("IAM_ARGON2_PARALLELISM")
                    .unwrap_or(default.password_hashing.parallelism),
            },
            mail: MailSettings {
                product_name: std::env::var("IAM_MAIL_PRODUCT_NAME")
                    .unwrap_or(default.mail.product_name),
                base_url: std::env::var("IAM_MAIL_BASE_URL").unwrap_or(default.mail.base_url),
            },
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.jwt.access_keys.is_configured() {
            return Err(ConfigError::MissingEnvVar("IAM_JWT_ACCESS_SECRET".to_string()));
        }
        if !self.jwt.refresh_keys.is_configured() {
            return Err(ConfigError::MissingEnvVar("IAM_JWT_REFRESH_SECRET".to_string()));
        }
        if self.throttle.ban_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "IAM_THROTTLE_BAN_THRESHOLD".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_BAN_SECS).contains(&self.throttle.ban_duration_secs) {
            return Err(ConfigError::InvalidValue {
                key: "IAM_THROTTLE_BAN_SECS".to_string(),
                message: format!("must be between 1 and {}", MAX_BAN_SECS),
            });
        }
        let lifetimes = [
            ("IAM_JWT_ACCESS_TTL_SECS", self.jwt.access_token_duration),
            ("IAM_JWT_REFRESH_TTL_SECS", self.jwt.refresh_token_duration),
        ];
        for (key, lifetime) in lifetimes {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&lifetime.num_seconds()) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be between 1 and {} seconds", MAX_TOKEN_TTL_SECS),
                });
            }
        }
        if let Some(unknown) = self
            .public_operations
            .iter()
            .find(|name| Endpoint::parse(name).is_none())
        {
            return Err(ConfigError::InvalidValue {
                key: "IAM_PUBLIC_OPERATIONS".to_string(),
                message: format!("unknown endpoint {}", unknown),
            });
        }
        Ok(())
    }
}
