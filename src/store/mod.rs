//! Document storage for postulations and matches.
//!
//! The matching core talks to storage only through the traits defined here:
//!
//! - [`PostulationStore`]: lookup, query, creation and single-record updates
//! - [`MatchStore`]: lookup and query of committed matches
//! - [`TransactionalStore`]: all-or-nothing [`WriteBatch`] commits guarded by
//!   record revisions (optimistic concurrency)
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`]: lock-guarded maps, ordered by id
//! - [`FileStore`]: a [`MemoryStore`] persisted to a JSON snapshot after every
//!   successful write
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodging_matcher::store::{MemoryStore, PostulationStore, StoreSnapshot};
//! use lodging_matcher::core::{EventId, RoleKind};
//!
//! # async fn demo() -> Result<(), lodging_matcher::store::StoreError> {
//! let store = MemoryStore::from_snapshot(StoreSnapshot::load_embedded()?)?;
//! let hosts = store
//!     .query_by_event_and_role(&EventId::new("fiesta-2025"), Some(RoleKind::Host))
//!     .await?;
//! println!("{} hosts", hosts.len());
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::pairing::{MatchRecord, NewMatch};
use crate::core::postulation::{NewPostulation, Postulation};
use crate::core::types::{
    EventId, MatchId, MatchStatus, PostulationId, RequesterId, RoleKind, Status,
};
use crate::error::Entity;

pub use file::{FileStore, StoreSnapshot, SNAPSHOT_VERSION};
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} '{id}' was modified concurrently (expected revision {expected}, found {found})")]
    Conflict {
        entity: Entity,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("{entity} '{id}' does not exist")]
    MissingRecord { entity: Entity, id: String },

    #[error("Rejected write to '{id}': {reason}")]
    RejectedWrite { id: String, reason: String },

    #[error("Failed to read or write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Conflict { .. } | Self::Io(_)
        )
    }
}

/// Filter for postulation queries; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostulationQuery {
    pub event_id: Option<EventId>,
    pub role: Option<RoleKind>,
    pub requester_id: Option<RequesterId>,
    /// Empty means any status
    pub statuses: Vec<Status>,
}

impl PostulationQuery {
    #[must_use]
    pub fn for_event(event_id: &EventId) -> Self {
        Self {
            event_id: Some(event_id.clone()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: RoleKind) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn with_requester(mut self, requester_id: &RequesterId) -> Self {
        self.requester_id = Some(requester_id.clone());
        self
    }

    #[must_use]
    pub fn with_statuses(mut self, statuses: &[Status]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    #[must_use]
    pub fn matches(&self, postulation: &Postulation) -> bool {
        self.event_id
            .as_ref()
            .map_or(true, |event| &postulation.event_id == event)
            && self.role.map_or(true, |role| postulation.role_kind() == role)
            && self
                .requester_id
                .as_ref()
                .map_or(true, |requester| &postulation.requester_id == requester)
            && (self.statuses.is_empty() || self.statuses.contains(&postulation.status))
    }
}

/// Filter for match queries; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchQuery {
    pub event_id: Option<EventId>,
    pub visitor_postulation_id: Option<PostulationId>,
    pub host_postulation_id: Option<PostulationId>,
    pub status: Option<MatchStatus>,
}

impl MatchQuery {
    #[must_use]
    pub fn matches(&self, record: &MatchRecord) -> bool {
        self.event_id
            .as_ref()
            .map_or(true, |event| &record.event_id == event)
            && self
                .visitor_postulation_id
                .as_ref()
                .map_or(true, |id| &record.visitor_postulation_id == id)
            && self
                .host_postulation_id
                .as_ref()
                .map_or(true, |id| &record.host_postulation_id == id)
            && self.status.map_or(true, |status| record.status == status)
    }
}

/// Change to a host's assigned-visitor list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedDelta {
    Unchanged,
    Add(PostulationId),
    Remove(PostulationId),
}

/// New capacity bookkeeping for a host postulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityChange {
    pub remaining: u32,
    pub assigned: AssignedDelta,
}

/// Update to one postulation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostulationPatch {
    pub id: PostulationId,
    /// Revision the caller read; `None` writes unconditionally
    pub expected_revision: Option<u64>,
    pub status: Option<Status>,
    pub observation: Option<String>,
    pub capacity: Option<CapacityChange>,
}

impl PostulationPatch {
    #[must_use]
    pub fn new(postulation: &Postulation) -> Self {
        Self {
            id: postulation.id.clone(),
            expected_revision: Some(postulation.revision),
            status: None,
            observation: None,
            capacity: None,
        }
    }

    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the observation; `None` keeps the current one
    #[must_use]
    pub fn observation(mut self, observation: Option<String>) -> Self {
        self.observation = observation;
        self
    }

    #[must_use]
    pub fn capacity(mut self, remaining: u32, assigned: AssignedDelta) -> Self {
        self.capacity = Some(CapacityChange {
            remaining,
            assigned,
        });
        self
    }
}

/// Write to a match inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchWrite {
    Create(NewMatch),
    Cancel {
        id: MatchId,
        expected_revision: Option<u64>,
    },
}

/// A set of writes the store applies atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub postulations: Vec<PostulationPatch>,
    pub matches: Vec<MatchWrite>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn patch(mut self, patch: PostulationPatch) -> Self {
        self.postulations.push(patch);
        self
    }

    #[must_use]
    pub fn write_match(mut self, write: MatchWrite) -> Self {
        self.matches.push(write);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.postulations.is_empty() && self.matches.is_empty()
    }
}

/// Records as they stand after a committed batch, in batch order
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    pub postulations: Vec<Postulation>,
    pub matches: Vec<MatchRecord>,
}

#[async_trait]
pub trait PostulationStore: Send + Sync {
    async fn get_postulation(&self, id: &PostulationId) -> Result<Option<Postulation>, StoreError>;

    /// Postulations matching `query`, in ascending id order
    async fn query_postulations(
        &self,
        query: &PostulationQuery,
    ) -> Result<Vec<Postulation>, StoreError>;

    /// Store a new postulation with status `pending`
    async fn create_postulation(&self, new: NewPostulation) -> Result<Postulation, StoreError>;

    async fn update_status(
        &self,
        id: &PostulationId,
        status: Status,
        observation: Option<String>,
    ) -> Result<Postulation, StoreError>;

    async fn update_host_capacity(
        &self,
        id: &PostulationId,
        remaining: u32,
        assigned: AssignedDelta,
    ) -> Result<Postulation, StoreError>;

    async fn query_by_event_and_role(
        &self,
        event_id: &EventId,
        role: Option<RoleKind>,
    ) -> Result<Vec<Postulation>, StoreError> {
        let mut query = PostulationQuery::for_event(event_id);
        query.role = role;
        self.query_postulations(&query).await
    }

    async fn query_by_requester_and_event(
        &self,
        requester_id: &RequesterId,
        event_id: &EventId,
        role: RoleKind,
    ) -> Result<Vec<Postulation>, StoreError> {
        let query = PostulationQuery::for_event(event_id)
            .with_role(role)
            .with_requester(requester_id);
        self.query_postulations(&query).await
    }
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_match(&self, id: &MatchId) -> Result<Option<MatchRecord>, StoreError>;

    /// Matches satisfying `query`, in ascending id order
    async fn query_matches(&self, query: &MatchQuery) -> Result<Vec<MatchRecord>, StoreError>;
}

#[async_trait]
pub trait TransactionalStore: PostulationStore + MatchStore {
    /// Apply every write in `batch` or none of them.
    ///
    /// Fails with [`StoreError::Conflict`] when a record's revision no longer
    /// equals the one the caller read.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;
}
