//! Typed error handling for the linking core
//!
//! Every operation returns [`LinkingError`], whose variants mirror the failure
//! kinds callers have to tell apart:
//!
//! - `NotFound`: a referenced actor, link, token or request is absent
//! - `Conflict`: a uniqueness invariant would be violated
//! - `Invalid`: a presented access code is malformed or matches no active token
//! - `Expired`: the matching token is past its expiry
//! - `AlreadyUsed`: a single-use token was already redeemed
//! - `InvalidState`: a request is no longer pending
//!
//! plus the ambient `Validation`, `Config` and `Storage` variants.
//!
//! # Example
//!
//! ```rust,ignore
//! match service.redeem_token(cmd, Utc::now()).await {
//!     Ok(link) => println!("linked: {}", link.id),
//!     Err(LinkingError::Expired { expires_at, .. }) => println!("code expired at {}", expires_at),
//!     Err(e) => eprintln!("{} ({})", e, e.error_code()),
//! }
//! ```

use crate::core::actor::{ActorKind, CompanyId, StudentId};
use crate::core::request::RequestStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = LinkingError> = std::result::Result<T, E>;

/// Kind of record a `NotFound` error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    Company,
    Link,
    AccessToken,
    LinkRequest,
}

impl From<ActorKind> for EntityKind {
    fn from(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Student => EntityKind::Student,
            ActorKind::Company => EntityKind::Company,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Student => "student",
            EntityKind::Company => "company",
            EntityKind::Link => "link",
            EntityKind::AccessToken => "access token",
            EntityKind::LinkRequest => "link request",
        };
        f.write_str(name)
    }
}

/// Which uniqueness invariant a `Conflict` error violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    ActiveLinkExists,
    PendingRequestExists,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::ActiveLinkExists => f.write_str("an active link already exists"),
            ConflictReason::PendingRequestExists => {
                f.write_str("a pending link request already exists")
            }
        }
    }
}

/// Coarse classification of a [`LinkingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Expired,
    AlreadyUsed,
    InvalidState,
    Validation,
    Config,
    Storage,
}

/// The error type of every linking operation
#[derive(Debug, Error)]
pub enum LinkingError {
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("{reason} between student {student_id} and company {company_id}")]
    Conflict {
        student_id: StudentId,
        company_id: CompanyId,
        reason: ConflictReason,
    },

    #[error("access code is invalid or inactive")]
    Invalid,

    #[error("access token '{token_id}' expired at {expires_at}")]
    Expired {
        token_id: Uuid,
        expires_at: DateTime<Utc>,
    },

    #[error("access token '{token_id}' has already been used")]
    AlreadyUsed { token_id: Uuid },

    #[error("link request '{request_id}' is already {status}")]
    InvalidState {
        request_id: Uuid,
        status: RequestStatus,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LinkingError {
    pub fn actor_not_found(kind: ActorKind, id: i64) -> Self {
        LinkingError::NotFound {
            entity: kind.into(),
            id: id.to_string(),
        }
    }

    pub fn link_not_found(id: Uuid) -> Self {
        LinkingError::NotFound {
            entity: EntityKind::Link,
            id: id.to_string(),
        }
    }

    pub fn token_not_found(id: Uuid) -> Self {
        LinkingError::NotFound {
            entity: EntityKind::AccessToken,
            id: id.to_string(),
        }
    }

    pub fn request_not_found(id: Uuid) -> Self {
        LinkingError::NotFound {
            entity: EntityKind::LinkRequest,
            id: id.to_string(),
        }
    }

    pub fn active_link_exists(student_id: StudentId, company_id: CompanyId) -> Self {
        LinkingError::Conflict {
            student_id,
            company_id,
            reason: ConflictReason::ActiveLinkExists,
        }
    }

    pub fn pending_request_exists(student_id: StudentId, company_id: CompanyId) -> Self {
        LinkingError::Conflict {
            student_id,
            company_id,
            reason: ConflictReason::PendingRequestExists,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkingError::NotFound { .. } => ErrorKind::NotFound,
            LinkingError::Conflict { .. } => ErrorKind::Conflict,
            LinkingError::Invalid => ErrorKind::Invalid,
            LinkingError::Expired { .. } => ErrorKind::Expired,
            LinkingError::AlreadyUsed { .. } => ErrorKind::AlreadyUsed,
            LinkingError::InvalidState { .. } => ErrorKind::InvalidState,
            LinkingError::Validation(_) => ErrorKind::Validation,
            LinkingError::Config(_) => ErrorKind::Config,
            LinkingError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Stable code for programmatic handling by any transport
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Invalid => "INVALID_TOKEN",
            ErrorKind::Expired => "TOKEN_EXPIRED",
            ErrorKind::AlreadyUsed => "TOKEN_ALREADY_USED",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
        }
    }

    /// Convert to a serializable error body
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            LinkingError::NotFound { entity, id } => Some(serde_json::json!({
                "entity": entity,
                "id": id,
            })),
            LinkingError::Conflict {
                student_id,
                company_id,
                reason,
            } => Some(serde_json::json!({
                "student_id": student_id,
                "company_id": company_id,
                "reason": reason,
            })),
            LinkingError::Expired {
                token_id,
                expires_at,
            } => Some(serde_json::json!({
                "token_id": token_id,
                "expires_at": expires_at,
            })),
            LinkingError::InvalidState { request_id, status } => Some(serde_json::json!({
                "request_id": request_id,
                "status": status,
            })),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for LinkingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LinkingError::Validation(errors.to_string())
    }
}

/// Error body suitable for any transport
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
