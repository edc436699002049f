//! Input commands of the linking service
//!
//! Commands are plain serde structs so any transport can deserialize them,
//! and are checked with `validator` before the service touches a store.

use crate::core::actor::{CompanyId, StudentId};
use crate::core::link::LinkOrigin;
use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_origin() -> LinkOrigin {
    LinkOrigin::Manual
}

/// Create a link directly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLink {
    pub student_id: StudentId,
    pub company_id: CompanyId,

    #[serde(default = "default_origin")]
    pub origin: LinkOrigin,

    /// Who or what created the link, e.g. an administrator name
    #[validate(length(min = 1, max = 255))]
    pub reference: String,
}

impl CreateLink {
    /// A manual link created by `reference`
    pub fn manual(
        student_id: impl Into<StudentId>,
        company_id: impl Into<CompanyId>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            company_id: company_id.into(),
            origin: LinkOrigin::Manual,
            reference: reference.into(),
        }
    }
}

/// Issue an access token for a company
///
/// Missing fields fall back to the configured token policy.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueToken {
    pub company_id: CompanyId,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub ttl_minutes: Option<u32>,

    #[serde(default)]
    pub single_use: Option<bool>,
}

impl IssueToken {
    pub fn new(company_id: impl Into<CompanyId>) -> Self {
        Self {
            company_id: company_id.into(),
            ttl_minutes: None,
            single_use: None,
        }
    }

    pub fn ttl_minutes(mut self, minutes: u32) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }

    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = Some(single_use);
        self
    }
}

/// Redeem a plaintext access code on behalf of a student
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RedeemToken {
    #[validate(length(min = 1, max = 64))]
    pub code: String,

    pub student_id: StudentId,
}

impl RedeemToken {
    pub fn new(code: impl Into<String>, student_id: impl Into<StudentId>) -> Self {
        Self {
            code: code.into(),
            student_id: student_id.into(),
        }
    }
}

// The code is a secret and stays out of logs
impl std::fmt::Debug for RedeemToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedeemToken")
            .field("code", &"<redacted>")
            .field("student_id", &self.student_id)
            .finish()
    }
}

/// Ask to join a company
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequest {
    pub student_id: StudentId,
    pub company_id: CompanyId,
}

impl CreateRequest {
    pub fn new(student_id: impl Into<StudentId>, company_id: impl Into<CompanyId>) -> Self {
        Self {
            student_id: student_id.into(),
            company_id: company_id.into(),
        }
    }
}

/// Reject a pending request, optionally with a reason
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RejectRequest {
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

impl RejectRequest {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}
