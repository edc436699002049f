//! Configuration loading and management

use crate::core::error::{LinkingError, Result};
use crate::core::hasher::Argon2Params;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Access token issuance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPolicy {
    /// Lifetime of a token when the issuer does not pick one
    pub default_ttl_minutes: u32,

    /// Whether a token is single-use when the issuer does not say
    pub default_single_use: bool,

    /// Random bytes per code; the code is twice as many hex characters
    pub code_bytes: usize,

    /// Upper bound for a requested lifetime
    pub max_ttl_minutes: u32,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            default_ttl_minutes: 30,
            default_single_use: true,
            code_bytes: 4,
            max_ttl_minutes: 1440,
        }
    }
}

impl TokenPolicy {
    pub fn default_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.default_ttl_minutes))
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Complete configuration of the linking subsystem
///
/// Every section is optional in YAML; missing keys take their defaults.
///
/// ```yaml
/// tokens:
///   default_ttl_minutes: 30
///   default_single_use: true
///   code_bytes: 4
///   max_ttl_minutes: 1440
/// hasher:
///   memory_kib: 19456
///   iterations: 2
///   parallelism: 1
/// events:
///   capacity: 1024
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub tokens: TokenPolicy,
    pub hasher: Argon2Params,
    pub events: EventsConfig,
}

impl LinkingConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LinkingError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| LinkingError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the token policy and event settings for consistency
    ///
    /// Hasher parameters are checked when the hasher is built.
    pub fn validate(&self) -> Result<()> {
        let tokens = &self.tokens;
        if tokens.default_ttl_minutes == 0 || tokens.max_ttl_minutes == 0 {
            return Err(LinkingError::Config(
                "token TTLs must be greater than zero".to_string(),
            ));
        }
        if tokens.default_ttl_minutes > tokens.max_ttl_minutes {
            return Err(LinkingError::Config(format!(
                "default_ttl_minutes ({}) exceeds max_ttl_minutes ({})",
                tokens.default_ttl_minutes, tokens.max_ttl_minutes
            )));
        }
        if !(2..=32).contains(&tokens.code_bytes) {
            return Err(LinkingError::Config(format!(
                "code_bytes must be between 2 and 32, got {}",
                tokens.code_bytes
            )));
        }
        if self.events.capacity == 0 {
            return Err(LinkingError::Config(
                "events.capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
