//! Internal event system for link lifecycle notifications
//!
//! The EventBus uses `tokio::sync::broadcast` to decouple mutations in the
//! linking service from whatever reacts to them (mailers, audit logs, caches).
//!
//! # Architecture
//!
//! ```text
//! LinkingService ──▶ EventBus::publish() ──▶ broadcast channel ──▶ notifier
//!                                                              ──▶ audit log
//! ```
//!
//! Events are published only after the corresponding mutation committed.
//! Publishing never fails and never changes the outcome of an operation.

use crate::core::actor::{CompanyId, StudentId};
use crate::core::link::LinkOrigin;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A committed change in the linking subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LinkingEvent {
    LinkCreated {
        link_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
        origin: LinkOrigin,
    },
    LinkDeactivated {
        link_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
    },
    LinkReactivated {
        link_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
    },
    TokenIssued {
        token_id: Uuid,
        company_id: CompanyId,
        expires_at: DateTime<Utc>,
    },
    TokenRevoked {
        token_id: Uuid,
        company_id: CompanyId,
    },
    TokenRedeemed {
        token_id: Uuid,
        link_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
    },
    RequestCreated {
        request_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
    },
    RequestApproved {
        request_id: Uuid,
        link_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
    },
    RequestRejected {
        request_id: Uuid,
        student_id: StudentId,
        company_id: CompanyId,
        reason: Option<String>,
    },
}

impl LinkingEvent {
    /// Short name of the event, matching its serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            LinkingEvent::LinkCreated { .. } => "link_created",
            LinkingEvent::LinkDeactivated { .. } => "link_deactivated",
            LinkingEvent::LinkReactivated { .. } => "link_reactivated",
            LinkingEvent::TokenIssued { .. } => "token_issued",
            LinkingEvent::TokenRevoked { .. } => "token_revoked",
            LinkingEvent::TokenRedeemed { .. } => "token_redeemed",
            LinkingEvent::RequestCreated { .. } => "request_created",
            LinkingEvent::RequestApproved { .. } => "request_approved",
            LinkingEvent::RequestRejected { .. } => "request_rejected",
        }
    }

    /// The company this event concerns
    pub fn company_id(&self) -> CompanyId {
        match self {
            LinkingEvent::LinkCreated { company_id, .. }
            | LinkingEvent::LinkDeactivated { company_id, .. }
            | LinkingEvent::LinkReactivated { company_id, .. }
            | LinkingEvent::TokenIssued { company_id, .. }
            | LinkingEvent::TokenRevoked { company_id, .. }
            | LinkingEvent::TokenRedeemed { company_id, .. }
            | LinkingEvent::RequestCreated { company_id, .. }
            | LinkingEvent::RequestApproved { company_id, .. }
            | LinkingEvent::RequestRejected { company_id, .. } => *company_id,
        }
    }

    /// The student this event concerns, if any
    pub fn student_id(&self) -> Option<StudentId> {
        match self {
            LinkingEvent::TokenIssued { .. } | LinkingEvent::TokenRevoked { .. } => None,
            LinkingEvent::LinkCreated { student_id, .. }
            | LinkingEvent::LinkDeactivated { student_id, .. }
            | LinkingEvent::LinkReactivated { student_id, .. }
            | LinkingEvent::TokenRedeemed { student_id, .. }
            | LinkingEvent::RequestCreated { student_id, .. }
            | LinkingEvent::RequestApproved { student_id, .. }
            | LinkingEvent::RequestRejected { student_id, .. } => Some(*student_id),
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Time of the operation that produced the event
    pub timestamp: DateTime<Utc>,
    pub event: LinkingEvent,
}

impl EventEnvelope {
    pub fn new(event: LinkingEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone (Arc internally) and shareable across threads.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// Slow receivers that fall more than `capacity` events behind get a
    /// `Lagged` error on their next `recv()`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers that will receive the event.
    pub fn publish(&self, event: LinkingEvent, timestamp: DateTime<Utc>) -> usize {
        let envelope = EventEnvelope::new(event, timestamp);
        // send() returns Err only if there are no receivers
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
