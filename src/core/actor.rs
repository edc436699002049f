//! Actor identifiers and the actor-existence seam
//!
//! Students and companies are owned by an external identity store. The linking
//! core never mutates them: it only needs to know whether an id resolves before
//! it writes anything that references it.

use crate::core::error::{LinkingError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Identifier of a student actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

/// Identifier of a company actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

impl From<i64> for StudentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i64> for CompanyId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of actor a link connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Student,
    Company,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Student => "student",
            ActorKind::Company => "company",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the external actor store
///
/// Implementations typically wrap the student/company repositories of the host
/// application. The linking service calls `exists` for both sides of a pair
/// before any mutation.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Check whether an actor of the given kind exists
    async fn exists(&self, kind: ActorKind, id: i64) -> Result<bool>;

    /// Human-readable name of an actor, if the directory knows one
    async fn display_name(&self, _kind: ActorKind, _id: i64) -> Result<Option<String>> {
        Ok(None)
    }
}

/// In-memory actor directory for tests and demos
#[derive(Clone, Default)]
pub struct InMemoryActorDirectory {
    actors: Arc<RwLock<HashMap<(ActorKind, i64), Option<String>>>>,
}

impl InMemoryActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a student id
    pub fn add_student(&self, id: impl Into<StudentId>) -> Result<StudentId> {
        let id = id.into();
        self.insert(ActorKind::Student, id.0, None)?;
        Ok(id)
    }

    /// Register a company id with an optional display name
    pub fn add_company(
        &self,
        id: impl Into<CompanyId>,
        name: Option<&str>,
    ) -> Result<CompanyId> {
        let id = id.into();
        self.insert(ActorKind::Company, id.0, name.map(str::to_string))?;
        Ok(id)
    }

    /// Forget an actor (simulates deletion in the external store)
    pub fn remove(&self, kind: ActorKind, id: i64) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire write lock: {}", e)))?;
        actors.remove(&(kind, id));
        Ok(())
    }

    fn insert(&self, kind: ActorKind, id: i64, name: Option<String>) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire write lock: {}", e)))?;
        actors.insert((kind, id), name);
        Ok(())
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn exists(&self, kind: ActorKind, id: i64) -> Result<bool> {
        let actors = self
            .actors
            .read()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire read lock: {}", e)))?;
        Ok(actors.contains_key(&(kind, id)))
    }

    async fn display_name(&self, kind: ActorKind, id: i64) -> Result<Option<String>> {
        let actors = self
            .actors
            .read()
            .map_err(|e| LinkingError::Storage(anyhow!("Failed to acquire read lock: {}", e)))?;
        Ok(actors.get(&(kind, id)).cloned().flatten())
    }
}
