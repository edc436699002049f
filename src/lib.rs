//! # company-links
//!
//! Student/company linking: manual links, short-lived access codes that let
//! a student join a company, and a request/approval workflow.
//!
//! ## Features
//!
//! - **Three ways to link**: manual creation, token redemption, request approval
//! - **Hashed access codes**: only an Argon2id hash of each code is stored
//! - **Uniqueness under concurrency**: one active link and one pending request
//!   per (student, company) pair, enforced by the store
//! - **Pluggable storage**: in-memory (default) and PostgreSQL (`postgres` feature)
//! - **Explicit time**: every operation takes `now`, so expiry is deterministic
//! - **Lifecycle events**: optional broadcast bus for notifiers and audit logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use company_links::prelude::*;
//! use std::sync::Arc;
//!
//! let actors = InMemoryActorDirectory::new();
//! actors.add_student(3)?;
//! actors.add_company(7, Some("Acme"))?;
//!
//! let service = LinkingService::new(
//!     Arc::new(InMemoryLinkingStore::new()),
//!     Arc::new(actors),
//!     LinkingConfig::default(),
//! )?;
//!
//! let issued = service.issue_token(IssueToken::new(7), Utc::now()).await?;
//! let link = service
//!     .redeem_token(RedeemToken::new(issued.code, 3), Utc::now())
//!     .await?;
//! assert_eq!(link.origin, LinkOrigin::Token);
//! ```

pub mod config;
pub mod core;
pub mod linking;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AccessToken, ActorDirectory, ActorKind, CompanyId, ErrorKind, ErrorResponse, IssuedToken,
        Link, LinkFilter, LinkOrigin, LinkRequest, LinkingError, LinkingStore, RequestFilter,
        RequestStatus, Result, StudentId,
        actor::InMemoryActorDirectory,
        events::{EventBus, EventEnvelope, LinkingEvent},
        hasher::{Argon2Params, Argon2SecretHasher, SecretHasher},
        token::{OsRandom, RandomSource},
    };

    // === Service ===
    pub use crate::linking::{
        CreateLink, CreateRequest, IssueToken, LinkingService, RedeemToken, RejectRequest,
    };

    // === Storage ===
    pub use crate::storage::InMemoryLinkingStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresLinkingStore;

    // === Config ===
    pub use crate::config::{EventsConfig, LinkingConfig, TokenPolicy};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
