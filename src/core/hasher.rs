//! One-way hashing of access codes

use crate::core::error::{LinkingError, Result};
use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

/// Salted one-way hash with verification
///
/// `verify` must compare in constant time and must not be replaced by a
/// lookup keyed on the secret.
pub trait SecretHasher: Send + Sync {
    /// Hash a secret with a fresh random salt
    fn hash(&self, secret: &str) -> Result<String>;

    /// Check a secret against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch and `Err` only when the stored hash
    /// itself is unreadable.
    fn verify(&self, secret: &str, hash: &str) -> Result<bool>;
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| LinkingError::Config(format!("invalid argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Argon2id implementation of [`SecretHasher`]
///
/// Hashes are PHC strings embedding salt and parameters, so verification
/// works across parameter changes.
#[derive(Debug, Clone)]
pub struct Argon2SecretHasher {
    params: Argon2Params,
}

impl Argon2SecretHasher {
    /// Create a hasher, rejecting parameters argon2 would refuse
    pub fn new(params: Argon2Params) -> Result<Self> {
        params.to_argon2()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> Argon2Params {
        self.params
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .params
            .to_argon2()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to hash secret: {}", e)))?;

        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| LinkingError::Storage(anyhow!("Unreadable stored hash: {}", e)))?;

        Ok(self
            .params
            .to_argon2()?
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}
