//! Core module containing the domain types and traits of the linking subsystem

pub mod actor;
pub mod error;
pub mod events;
pub mod hasher;
pub mod link;
pub mod request;
pub mod store;
pub mod token;

pub use actor::{ActorDirectory, ActorKind, CompanyId, InMemoryActorDirectory, StudentId};
pub use error::{ConflictReason, EntityKind, ErrorKind, ErrorResponse, LinkingError, Result};
pub use events::{EventBus, EventEnvelope, LinkingEvent};
pub use hasher::{Argon2Params, Argon2SecretHasher, SecretHasher};
pub use link::{Link, LinkFilter, LinkOrigin};
pub use request::{Approval, LinkRequest, RequestFilter, RequestState, RequestStatus};
pub use store::{LinkStore, LinkingStore, RequestStore, TokenStore};
pub use token::{AccessToken, IssuedToken, OsRandom, RandomSource, Redemption};
