//! In-memory implementation of LinkingStore for testing and development

use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::link::{Link, LinkFilter, LinkOrigin, sort_links};
use crate::core::request::{Approval, LinkRequest, RequestFilter, sort_requests};
use crate::core::store::{LinkStore, LinkingStore, RequestStore, TokenStore};
use crate::core::token::{AccessToken, Redemption};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    links: HashMap<Uuid, Link>,
    tokens: HashMap<Uuid, AccessToken>,
    requests: HashMap<Uuid, LinkRequest>,
}

impl Tables {
    fn active_link(&self, student_id: StudentId, company_id: CompanyId) -> Option<&Link> {
        self.links
            .values()
            .find(|link| link.is_active_for(student_id, company_id))
    }

    fn ensure_no_active_link(&self, student_id: StudentId, company_id: CompanyId) -> Result<()> {
        match self.active_link(student_id, company_id) {
            Some(_) => Err(LinkingError::active_link_exists(student_id, company_id)),
            None => Ok(()),
        }
    }
}

/// In-memory linking store
///
/// All three tables sit behind one RwLock, and every mutating unit runs
/// under a single write guard, which serializes conflicting writers.
#[derive(Clone, Default)]
pub struct InMemoryLinkingStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLinkingStore {
    /// Create a new in-memory linking store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkingStore {
    async fn insert_link(&self, link: Link) -> Result<Link> {
        let mut tables = self.write()?;
        if link.active {
            tables.ensure_no_active_link(link.student_id, link.company_id)?;
        }
        tables.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn get_link(&self, id: &Uuid) -> Result<Option<Link>> {
        let tables = self.read()?;
        Ok(tables.links.get(id).cloned())
    }

    async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<Link>> {
        let tables = self.read()?;
        let mut links: Vec<Link> = tables
            .links
            .values()
            .filter(|link| filter.matches(link))
            .cloned()
            .collect();
        sort_links(&mut links);
        Ok(links)
    }

    async fn find_active_link(
        &self,
        student_id: StudentId,
        company_id: CompanyId,
    ) -> Result<Option<Link>> {
        let tables = self.read()?;
        Ok(tables.active_link(student_id, company_id).cloned())
    }

    async fn deactivate_link(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Link> {
        let mut tables = self.write()?;
        let link = tables
            .links
            .get_mut(id)
            .ok_or_else(|| LinkingError::link_not_found(*id))?;
        link.deactivate(now);
        Ok(link.clone())
    }

    async fn reactivate_link(&self, id: &Uuid) -> Result<Link> {
        let mut tables = self.write()?;
        let (student_id, company_id) = tables
            .links
            .get(id)
            .map(|link| (link.student_id, link.company_id))
            .ok_or_else(|| LinkingError::link_not_found(*id))?;

        if let Some(other) = tables.active_link(student_id, company_id) {
            if other.id != *id {
                return Err(LinkingError::active_link_exists(student_id, company_id));
            }
        }

        let link = tables
            .links
            .get_mut(id)
            .ok_or_else(|| LinkingError::link_not_found(*id))?;
        link.reactivate();
        Ok(link.clone())
    }
}

#[async_trait]
impl TokenStore for InMemoryLinkingStore {
    async fn insert_token(&self, token: AccessToken) -> Result<AccessToken> {
        let mut tables = self.write()?;
        tables.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_token(&self, id: &Uuid) -> Result<Option<AccessToken>> {
        let tables = self.read()?;
        Ok(tables.tokens.get(id).cloned())
    }

    async fn list_tokens(&self, company_id: Option<CompanyId>) -> Result<Vec<AccessToken>> {
        let tables = self.read()?;
        let mut tokens: Vec<AccessToken> = tables
            .tokens
            .values()
            .filter(|token| company_id.is_none_or(|c| token.company_id == c))
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn active_tokens(&self) -> Result<Vec<AccessToken>> {
        let tables = self.read()?;
        Ok(tables
            .tokens
            .values()
            .filter(|token| token.active)
            .cloned()
            .collect())
    }

    async fn revoke_token(&self, id: &Uuid) -> Result<AccessToken> {
        let mut tables = self.write()?;
        let token = tables
            .tokens
            .get_mut(id)
            .ok_or_else(|| LinkingError::token_not_found(*id))?;
        token.revoke();
        Ok(token.clone())
    }
}

#[async_trait]
impl RequestStore for InMemoryLinkingStore {
    async fn insert_request(&self, request: LinkRequest) -> Result<LinkRequest> {
        let mut tables = self.write()?;
        let (student_id, company_id) = (request.student_id, request.company_id);

        tables.ensure_no_active_link(student_id, company_id)?;

        let pending_exists = tables.requests.values().any(|r| {
            r.is_pending() && r.student_id == student_id && r.company_id == company_id
        });
        if pending_exists {
            return Err(LinkingError::pending_request_exists(student_id, company_id));
        }

        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: &Uuid) -> Result<Option<LinkRequest>> {
        let tables = self.read()?;
        Ok(tables.requests.get(id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<LinkRequest>> {
        let tables = self.read()?;
        let mut requests: Vec<LinkRequest> = tables
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        sort_requests(&mut requests);
        Ok(requests)
    }

    async fn reject_request(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<LinkRequest> {
        let mut tables = self.write()?;
        let request = tables
            .requests
            .get_mut(id)
            .ok_or_else(|| LinkingError::request_not_found(*id))?;
        request.reject(now, reason)?;
        Ok(request.clone())
    }
}

#[async_trait]
impl LinkingStore for InMemoryLinkingStore {
    async fn redeem_token(
        &self,
        token_id: &Uuid,
        student_id: StudentId,
        now: DateTime<Utc>,
    ) -> Result<Redemption> {
        let mut tables = self.write()?;

        // A token that disappeared between the scan and now matches nothing
        let mut token = tables
            .tokens
            .get(token_id)
            .cloned()
            .ok_or(LinkingError::Invalid)?;
        token.check_redeemable(now)?;
        tables.ensure_no_active_link(student_id, token.company_id)?;

        let link = Link::new(
            student_id,
            token.company_id,
            LinkOrigin::Token,
            token.id.to_string(),
            now,
        );
        token.mark_used(student_id, now);

        tables.links.insert(link.id, link.clone());
        tables.tokens.insert(token.id, token.clone());

        Ok(Redemption { token, link })
    }

    async fn approve_request(&self, request_id: &Uuid, now: DateTime<Utc>) -> Result<Approval> {
        let mut tables = self.write()?;

        let mut request = tables
            .requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| LinkingError::request_not_found(*request_id))?;
        request.approve(now)?;
        tables.ensure_no_active_link(request.student_id, request.company_id)?;

        let link = Link::new(
            request.student_id,
            request.company_id,
            LinkOrigin::Request,
            request.id.to_string(),
            now,
        );

        tables.links.insert(link.id, link.clone());
        tables.requests.insert(request.id, request.clone());

        Ok(Approval { request, link })
    }
}
