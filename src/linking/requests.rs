//! Request/approval workflow of the linking service

use super::LinkingService;
use super::commands::{CreateRequest, RejectRequest};
use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::events::LinkingEvent;
use crate::core::link::Link;
use crate::core::request::{Approval, LinkRequest, RequestFilter, RequestStatus};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

impl LinkingService {
    /// Open a pending request for a student to join a company
    ///
    /// Fails with `Conflict` if the pair is already linked or already has a
    /// pending request.
    #[instrument(skip(self, cmd), fields(student_id = %cmd.student_id, company_id = %cmd.company_id), err)]
    pub async fn create_request(
        &self,
        cmd: CreateRequest,
        now: DateTime<Utc>,
    ) -> Result<LinkRequest> {
        cmd.validate()?;
        self.ensure_pair(cmd.student_id, cmd.company_id).await?;

        let request = self
            .store
            .insert_request(LinkRequest::new(cmd.student_id, cmd.company_id, now))
            .await?;

        info!(request_id = %request.id, "link request created");
        self.publish(
            LinkingEvent::RequestCreated {
                request_id: request.id,
                student_id: request.student_id,
                company_id: request.company_id,
            },
            now,
        );
        Ok(request)
    }

    /// List requests, most recently requested first
    pub async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<LinkRequest>> {
        self.store.list_requests(&filter).await
    }

    /// Requests addressed to a company, e.g. its pending inbox
    pub async fn list_company_requests(
        &self,
        company_id: CompanyId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<LinkRequest>> {
        let filter = RequestFilter {
            company_id: Some(company_id),
            status,
            ..RequestFilter::default()
        };
        self.store.list_requests(&filter).await
    }

    /// Requests a student has made
    pub async fn list_student_requests(
        &self,
        student_id: StudentId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<LinkRequest>> {
        let filter = RequestFilter {
            student_id: Some(student_id),
            status,
            ..RequestFilter::default()
        };
        self.store.list_requests(&filter).await
    }

    pub async fn get_request(&self, id: &Uuid) -> Result<LinkRequest> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| LinkingError::request_not_found(*id))
    }

    /// Approve a pending request, creating a link with origin `request`
    ///
    /// The transition and the link are committed together: if the pair is
    /// already linked the request stays pending and `Conflict` is returned.
    #[instrument(skip(self), err)]
    pub async fn approve_request(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Link> {
        let request = self.get_request(id).await?;
        request.ensure_pending()?;
        self.ensure_pair(request.student_id, request.company_id)
            .await?;

        let Approval { request, link } = self.store.approve_request(id, now).await?;

        info!(link_id = %link.id, student_id = %link.student_id, company_id = %link.company_id, "link request approved");
        self.publish(
            LinkingEvent::RequestApproved {
                request_id: request.id,
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
            },
            now,
        );
        self.publish(
            LinkingEvent::LinkCreated {
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
                origin: link.origin,
            },
            now,
        );
        Ok(link)
    }

    /// Reject a pending request; a blank reason is stored as none
    #[instrument(skip(self, cmd), err)]
    pub async fn reject_request(
        &self,
        id: &Uuid,
        cmd: RejectRequest,
        now: DateTime<Utc>,
    ) -> Result<LinkRequest> {
        cmd.validate()?;
        let request = self.store.reject_request(id, now, cmd.reason).await?;

        info!(student_id = %request.student_id, company_id = %request.company_id, "link request rejected");
        self.publish(
            LinkingEvent::RequestRejected {
                request_id: request.id,
                student_id: request.student_id,
                company_id: request.company_id,
                reason: request.rejection_reason().map(str::to_string),
            },
            now,
        );
        Ok(request)
    }
}
