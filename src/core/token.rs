//! Access tokens: short-lived codes that let a student join a company
//!
//! Only a salted one-way hash of each code is stored. Redemption therefore
//! cannot look a token up by its code; it hashes-and-compares the presented
//! code against every active token in turn (see `linking::tokens`).

use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::link::Link;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored metadata of an issued access code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: Uuid,

    /// Company a redemption links to
    pub company_id: CompanyId,

    /// PHC-formatted hash of the code; never serialized
    #[serde(skip_serializing, default)]
    pub secret_hash: String,

    /// Cleared by revocation, independently of expiry
    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    pub single_use: bool,

    pub used: bool,

    pub used_at: Option<DateTime<Utc>>,

    pub used_by: Option<StudentId>,
}

impl AccessToken {
    pub fn new(
        company_id: CompanyId,
        secret_hash: String,
        now: DateTime<Utc>,
        ttl: Duration,
        single_use: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            secret_hash,
            active: true,
            created_at: now,
            expires_at: now + ttl,
            single_use,
            used: false,
            used_at: None,
            used_by: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check that this token may be redeemed at `now`
    ///
    /// Revoked tokens are reported as `Invalid`, as if the code matched
    /// nothing. Expiry is checked before usage.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.active {
            return Err(LinkingError::Invalid);
        }
        if self.is_expired(now) {
            return Err(LinkingError::Expired {
                token_id: self.id,
                expires_at: self.expires_at,
            });
        }
        if self.single_use && self.used {
            return Err(LinkingError::AlreadyUsed { token_id: self.id });
        }
        Ok(())
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.check_redeemable(now).is_ok()
    }

    pub fn mark_used(&mut self, student_id: StudentId, now: DateTime<Utc>) {
        self.used = true;
        self.used_at = Some(now);
        self.used_by = Some(student_id);
    }

    pub fn revoke(&mut self) {
        self.active = false;
    }
}

/// Result of issuing a token: the only place the plaintext code ever appears
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token_id: Uuid,

    /// Plaintext code, shown once and unrecoverable afterwards
    pub code: String,

    pub company_id: CompanyId,

    /// Display name of the company, when the actor directory knows it
    pub company_name: Option<String>,

    pub expires_at: DateTime<Utc>,

    pub single_use: bool,
}

/// Outcome of a successful redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    pub token: AccessToken,
    pub link: Link,
}

/// Cryptographically secure byte source for access codes
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// Operating-system randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// Generate a code of `bytes` random bytes rendered as upper-case hex
///
/// With the default 4 bytes this yields 8 characters and 32 bits of entropy,
/// which only suits short-lived, rate-limited codes.
pub fn generate_code(source: &dyn RandomSource, bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    source.fill(&mut buf);
    hex::encode_upper(buf)
}

/// Normalize a presented code before verification
///
/// Trims surrounding whitespace and upper-cases. Returns `None` when the
/// result is empty or not hexadecimal, since such a code cannot match.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(code)
}
