//! Linking service: the orchestrator callers talk to
//!
//! [`LinkingService`] checks that referenced actors exist, validates input
//! commands, and delegates to a [`LinkingStore`]. It holds no state of its
//! own; every uniqueness invariant is enforced by the store.
//!
//! Operations are split by concern:
//!
//! - [`links`]: manual links, listing, deactivate/reactivate
//! - [`tokens`]: issuing, revoking and redeeming access codes
//! - [`requests`]: the request/approval workflow

pub mod commands;
pub mod links;
pub mod requests;
pub mod tokens;

pub use commands::{CreateLink, CreateRequest, IssueToken, RedeemToken, RejectRequest};

use crate::config::LinkingConfig;
use crate::core::actor::{ActorDirectory, ActorKind, CompanyId, StudentId};
use crate::core::error::{LinkingError, Result};
use crate::core::events::{EventBus, LinkingEvent};
use crate::core::hasher::{Argon2SecretHasher, SecretHasher};
use crate::core::store::LinkingStore;
use crate::core::token::{OsRandom, RandomSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Entry point of the linking subsystem
///
/// # Example
///
/// ```rust,ignore
/// let actors = InMemoryActorDirectory::new();
/// actors.add_student(3)?;
/// actors.add_company(7, Some("Acme"))?;
///
/// let service = LinkingService::new(
///     Arc::new(InMemoryLinkingStore::new()),
///     Arc::new(actors),
///     LinkingConfig::default(),
/// )?;
///
/// let issued = service.issue_token(IssueToken::new(7), Utc::now()).await?;
/// let link = service
///     .redeem_token(RedeemToken::new(issued.code, 3), Utc::now())
///     .await?;
/// ```
#[derive(Clone)]
pub struct LinkingService {
    store: Arc<dyn LinkingStore>,
    actors: Arc<dyn ActorDirectory>,
    hasher: Arc<dyn SecretHasher>,
    random: Arc<dyn RandomSource>,
    config: Arc<LinkingConfig>,
    events: Option<EventBus>,
}

impl LinkingService {
    /// Build a service with Argon2id hashing and OS randomness
    ///
    /// Fails with `Config` if the configuration is inconsistent.
    pub fn new(
        store: Arc<dyn LinkingStore>,
        actors: Arc<dyn ActorDirectory>,
        config: LinkingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let hasher = Argon2SecretHasher::new(config.hasher)?;

        Ok(Self {
            store,
            actors,
            hasher: Arc::new(hasher),
            random: Arc::new(OsRandom),
            config: Arc::new(config),
            events: None,
        })
    }

    /// Replace the secret hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn SecretHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the random source used for access codes
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Publish lifecycle events on the given bus
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Publish lifecycle events on a new bus sized from the configuration
    pub fn with_events(self) -> Self {
        let bus = EventBus::new(self.config.events.capacity);
        self.with_event_bus(bus)
    }

    pub fn config(&self) -> &LinkingConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    async fn ensure_actor(&self, kind: ActorKind, id: i64) -> Result<()> {
        if self.actors.exists(kind, id).await? {
            Ok(())
        } else {
            Err(LinkingError::actor_not_found(kind, id))
        }
    }

    /// Both actors are confirmed independently, student first
    async fn ensure_pair(&self, student_id: StudentId, company_id: CompanyId) -> Result<()> {
        self.ensure_actor(ActorKind::Student, student_id.0).await?;
        self.ensure_actor(ActorKind::Company, company_id.0).await
    }

    fn publish(&self, event: LinkingEvent, now: DateTime<Utc>) {
        if let Some(bus) = &self.events {
            let receivers = bus.publish(event, now);
            tracing::trace!(receivers, "event published");
        }
    }
}
