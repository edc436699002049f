//! Link requests and their approval state machine
//!
//! ```text
//! pending ──approve──▶ approved   (terminal, a link is created)
//!    │
//!    └────reject────▶ rejected   (terminal, optional reason)
//! ```
//!
//! State is a tagged variant, so a response timestamp or a rejection reason
//! can only exist in the states that carry them.

use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::link::Link;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Flat status of a request, used for filtering and storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// State of a request, with the data each state carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Approved {
        responded_at: DateTime<Utc>,
    },
    Rejected {
        responded_at: DateTime<Utc>,
        rejection_reason: Option<String>,
    },
}

impl RequestState {
    pub fn status(&self) -> RequestStatus {
        match self {
            RequestState::Pending => RequestStatus::Pending,
            RequestState::Approved { .. } => RequestStatus::Approved,
            RequestState::Rejected { .. } => RequestStatus::Rejected,
        }
    }
}

/// A student's request to be linked to a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub id: Uuid,

    pub student_id: StudentId,

    pub company_id: CompanyId,

    pub requested_at: DateTime<Utc>,

    #[serde(flatten)]
    pub state: RequestState,
}

impl LinkRequest {
    /// Create a new pending request
    pub fn new(student_id: StudentId, company_id: CompanyId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            company_id,
            requested_at: now,
            state: RequestState::Pending,
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.state.status()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending)
    }

    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            RequestState::Pending => None,
            RequestState::Approved { responded_at }
            | RequestState::Rejected { responded_at, .. } => Some(*responded_at),
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.state {
            RequestState::Rejected {
                rejection_reason, ..
            } => rejection_reason.as_deref(),
            _ => None,
        }
    }

    /// Fail with `InvalidState` unless the request is still pending
    pub fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(LinkingError::InvalidState {
                request_id: self.id,
                status: self.status(),
            })
        }
    }

    /// Transition `pending -> approved`
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.state = RequestState::Approved { responded_at: now };
        Ok(())
    }

    /// Transition `pending -> rejected`
    ///
    /// A blank reason is stored as `None`.
    pub fn reject(&mut self, now: DateTime<Utc>, reason: Option<String>) -> Result<()> {
        self.ensure_pending()?;
        self.state = RequestState::Rejected {
            responded_at: now,
            rejection_reason: reason.filter(|r| !r.trim().is_empty()),
        };
        Ok(())
    }
}

/// Filter for listing requests; empty fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub student_id: Option<StudentId>,
    pub company_id: Option<CompanyId>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, request: &LinkRequest) -> bool {
        self.student_id.is_none_or(|s| request.student_id == s)
            && self.company_id.is_none_or(|c| request.company_id == c)
            && self.status.is_none_or(|st| request.status() == st)
    }
}

/// Order requests most recent first
pub fn sort_requests(requests: &mut [LinkRequest]) {
    requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
}

/// Outcome of a successful approval
#[derive(Debug, Clone)]
pub struct Approval {
    pub request: LinkRequest,
    pub link: Link,
}
