//! Student/company links
//!
//! A link records that a student is attached to a company. Links are never
//! hard-deleted: unlinking flips `active` off and stamps `unlinked_at`, and a
//! later relink flips it back on. At most one active link may exist per
//! (student, company) pair; inactive history rows are unconstrained.

use crate::core::actor::{CompanyId, StudentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a link came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOrigin {
    /// The student redeemed an access code issued by the company
    Token,
    /// A pending link request was approved
    Request,
    /// An administrator created the link directly
    Manual,
}

impl LinkOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkOrigin::Token => "token",
            LinkOrigin::Request => "request",
            LinkOrigin::Manual => "manual",
        }
    }
}

impl fmt::Display for LinkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token" => Ok(LinkOrigin::Token),
            "request" => Ok(LinkOrigin::Request),
            "manual" => Ok(LinkOrigin::Manual),
            other => Err(format!("unknown link origin '{}'", other)),
        }
    }
}

/// An association between a student and a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique identifier for this link
    pub id: Uuid,

    pub student_id: StudentId,

    pub company_id: CompanyId,

    /// Whether the association currently holds
    pub active: bool,

    /// When the link was created
    pub linked_at: DateTime<Utc>,

    /// When the link was last deactivated (cleared on reactivation)
    pub unlinked_at: Option<DateTime<Utc>>,

    pub origin: LinkOrigin,

    /// Free-text reference to whoever or whatever established the link
    ///
    /// An administrator name for manual links, the token id for token
    /// redemptions, the request id for approved requests.
    pub linked_by: String,
}

impl Link {
    /// Create a new active link
    pub fn new(
        student_id: StudentId,
        company_id: CompanyId,
        origin: LinkOrigin,
        linked_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            company_id,
            active: true,
            linked_at: now,
            unlinked_at: None,
            origin,
            linked_by: linked_by.into(),
        }
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.unlinked_at = Some(now);
    }

    pub fn reactivate(&mut self) {
        self.active = true;
        self.unlinked_at = None;
    }

    /// Whether this link is the active link of the given pair
    pub fn is_active_for(&self, student_id: StudentId, company_id: CompanyId) -> bool {
        self.active && self.student_id == student_id && self.company_id == company_id
    }
}

/// Filter for listing links; empty fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFilter {
    pub student_id: Option<StudentId>,
    pub company_id: Option<CompanyId>,
    pub active: Option<bool>,
}

impl LinkFilter {
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

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn matches(&self, link: &Link) -> bool {
        self.student_id.is_none_or(|s| link.student_id == s)
            && self.company_id.is_none_or(|c| link.company_id == c)
            && self.active.is_none_or(|a| link.active == a)
    }
}

/// Order links most recent first
pub fn sort_links(links: &mut [Link]) {
    links.sort_by(|a, b| b.linked_at.cmp(&a.linked_at));
}
