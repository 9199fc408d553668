//! Password hashing and one-time tokens
//!
//! Passwords are hashed with Argon2id; the salt is generated per hash and
//! carried inside the PHC string. Verification tokens for e-mail flows are
//! random alphanumeric strings compared in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{distributions::Alphanumeric, Rng};
use subtle::ConstantTimeEq;

use crate::error::{AuthError, AuthResult};

/// Default length of verification and reset tokens.
pub const TOKEN_LENGTH: usize = 32;

/// Newtype for a plaintext password to keep it out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// Cheapest parameters argon2 accepts. Tests only.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Password hasher with fixed cost parameters.
pub struct PasswordHasherService {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasherService")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasherService {
    /// Build a hasher.
    ///
    /// # Errors
    ///
    /// `ConfigError` when argon2 rejects the parameters.
    pub fn new(params: HashParams) -> AuthResult<Self> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::ConfigError(format!("Invalid argon2 parameters: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // Hash of a random password, used to equalize timing for unknown accounts.
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(generate_token(TOKEN_LENGTH).as_bytes(), &salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password into a PHC string.
    pub fn hash(&self, password: &Password) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_str().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Check a password against a stored hash.
    ///
    /// An unparsable hash verifies as `false`.
    pub fn verify(&self, password: &Password, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_str().as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
                false
            }
        }
    }

    /// Spend the same work as [`verify`](Self::verify) without an account.
    pub fn verify_dummy(&self, password: &Password) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

/// Random alphanumeric token of `len` characters.
pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Constant-time token comparison.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasherService {
        PasswordHasherService::new(HashParams::insecure_fast()).unwrap()
    }

    #[test]
    fn test_hash_password() {
        let hash = hasher().hash(&Password::new("mySecurePassword123")).unwrap();
        assert!(hash.starts_with("$argon2id"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = hasher();
        let password = Password::new("mySecurePassword123");
        let hash = hasher.hash(&password).unwrap();

        assert!(hasher.verify(&password, &hash));
        assert!(!hasher.verify(&Password::new("wrongPassword"), &hash));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = hasher();
        let password = Password::new("mySecurePassword123");
        let a = hasher.hash(&password).unwrap();
        let b = hasher.hash(&password).unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify(&password, &a));
        assert!(hasher.verify(&password, &b));
    }

    #[test]
    fn test_garbage_hash_does_not_verify() {
        assert!(!hasher().verify(&Password::new("x"), "not-a-hash"));
    }

    #[test]
    fn test_invalid_params() {
        let params = HashParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            PasswordHasherService::new(params),
            Err(AuthError::ConfigError(_))
        ));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let debug = format!("{:?}", Password::new("hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token(TOKEN_LENGTH);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token(TOKEN_LENGTH));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc"));
    }
}
