//! Storage traits for links, tokens and requests
//!
//! Each entity has its own store trait. Uniqueness invariants are enforced
//! by the store, inside the same critical section or transaction as the
//! write, so that two racing callers cannot both pass a check-then-act:
//!
//! - at most one active link per (student, company)
//! - at most one pending request per (student, company)
//!
//! [`LinkingStore`] adds the two operations that touch more than one entity
//! and must commit as a single unit.

use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::Result;
use crate::core::link::{Link, LinkFilter};
use crate::core::request::{Approval, LinkRequest, RequestFilter};
use crate::core::token::{AccessToken, Redemption};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persist a new link
    ///
    /// Fails with `Conflict` if the pair already has an active link.
    async fn insert_link(&self, link: Link) -> Result<Link>;

    async fn get_link(&self, id: &Uuid) -> Result<Option<Link>>;

    /// List links matching the filter, most recent `linked_at` first
    async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<Link>>;

    async fn find_active_link(
        &self,
        student_id: StudentId,
        company_id: CompanyId,
    ) -> Result<Option<Link>>;

    /// Set `active = false` and `unlinked_at = now`
    ///
    /// Fails with `NotFound` for an unknown id. Deactivating an inactive
    /// link is accepted and leaves the same end state.
    async fn deactivate_link(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Link>;

    /// Set `active = true` and clear `unlinked_at`
    ///
    /// Fails with `NotFound` for an unknown id and with `Conflict` if a
    /// different link of the same pair is active.
    async fn reactivate_link(&self, id: &Uuid) -> Result<Link>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, token: AccessToken) -> Result<AccessToken>;

    async fn get_token(&self, id: &Uuid) -> Result<Option<AccessToken>>;

    /// List tokens, optionally of one company, most recently created first
    async fn list_tokens(&self, company_id: Option<CompanyId>) -> Result<Vec<AccessToken>>;

    /// All tokens with `active = true`, the candidate set for redemption
    async fn active_tokens(&self) -> Result<Vec<AccessToken>>;

    /// Set `active = false` regardless of expiry or usage
    async fn revoke_token(&self, id: &Uuid) -> Result<AccessToken>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new pending request
    ///
    /// Fails with `Conflict` if the pair has an active link or already has
    /// a pending request.
    async fn insert_request(&self, request: LinkRequest) -> Result<LinkRequest>;

    async fn get_request(&self, id: &Uuid) -> Result<Option<LinkRequest>>;

    /// List requests matching the filter, most recent `requested_at` first
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<LinkRequest>>;

    /// Transition a pending request to rejected
    ///
    /// Fails with `NotFound` or `InvalidState`.
    async fn reject_request(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<LinkRequest>;
}

/// Combined store exposing the cross-entity atomic units
#[async_trait]
pub trait LinkingStore: LinkStore + TokenStore + RequestStore {
    /// Consume a token and create the resulting link, as one unit
    ///
    /// Re-validates the token at commit time (active, unexpired, and unused
    /// if single-use) and fails with `Conflict` if the pair already has an
    /// active link. On any failure neither the token nor the links change.
    async fn redeem_token(
        &self,
        token_id: &Uuid,
        student_id: StudentId,
        now: DateTime<Utc>,
    ) -> Result<Redemption>;

    /// Approve a pending request and create the resulting link, as one unit
    ///
    /// Fails with `NotFound`, `InvalidState`, or `Conflict` if the pair
    /// already has an active link; on failure the request stays pending.
    async fn approve_request(&self, request_id: &Uuid, now: DateTime<Utc>) -> Result<Approval>;
}
