//! Link operations of the linking service

use super::LinkingService;
use super::commands::CreateLink;
use crate::core::actor::{CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::events::LinkingEvent;
use crate::core::link::{Link, LinkFilter};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

impl LinkingService {
    /// Create an active link between a student and a company
    ///
    /// Fails with `NotFound` if either actor is unknown and with `Conflict`
    /// if the pair already has an active link.
    #[instrument(skip(self, cmd), fields(student_id = %cmd.student_id, company_id = %cmd.company_id), err)]
    pub async fn create_link(&self, cmd: CreateLink, now: DateTime<Utc>) -> Result<Link> {
        cmd.validate()?;
        self.ensure_pair(cmd.student_id, cmd.company_id).await?;

        let link = Link::new(
            cmd.student_id,
            cmd.company_id,
            cmd.origin,
            cmd.reference,
            now,
        );
        let link = self.store.insert_link(link).await?;

        info!(link_id = %link.id, origin = %link.origin, "link created");
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

    /// List links, most recently linked first
    pub async fn list_links(&self, filter: LinkFilter) -> Result<Vec<Link>> {
        self.store.list_links(&filter).await
    }

    /// Companies a student is or was linked to
    pub async fn list_student_links(
        &self,
        student_id: StudentId,
        active: Option<bool>,
    ) -> Result<Vec<Link>> {
        let filter = LinkFilter {
            student_id: Some(student_id),
            active,
            ..LinkFilter::default()
        };
        self.store.list_links(&filter).await
    }

    /// Students a company is or was linked to
    pub async fn list_company_links(
        &self,
        company_id: CompanyId,
        active: Option<bool>,
    ) -> Result<Vec<Link>> {
        let filter = LinkFilter {
            company_id: Some(company_id),
            active,
            ..LinkFilter::default()
        };
        self.store.list_links(&filter).await
    }

    pub async fn get_link(&self, id: &Uuid) -> Result<Link> {
        self.store
            .get_link(id)
            .await?
            .ok_or_else(|| LinkingError::link_not_found(*id))
    }

    /// Unlink: `active = false`, `unlinked_at = now`
    ///
    /// Deactivating an inactive link is accepted.
    #[instrument(skip(self), err)]
    pub async fn deactivate_link(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Link> {
        let link = self.store.deactivate_link(id, now).await?;

        info!(student_id = %link.student_id, company_id = %link.company_id, "link deactivated");
        self.publish(
            LinkingEvent::LinkDeactivated {
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
            },
            now,
        );
        Ok(link)
    }

    /// Relink: `active = true`, `unlinked_at` cleared
    ///
    /// Fails with `Conflict` if another link of the pair is active.
    #[instrument(skip(self), err)]
    pub async fn reactivate_link(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Link> {
        let link = self.store.reactivate_link(id).await?;

        info!(student_id = %link.student_id, company_id = %link.company_id, "link reactivated");
        self.publish(
            LinkingEvent::LinkReactivated {
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
            },
            now,
        );
        Ok(link)
    }
}
