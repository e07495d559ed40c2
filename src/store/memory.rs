//! In-memory storage backend.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::pairing::MatchRecord;
use crate::core::postulation::{NewPostulation, Postulation, Role};
use crate::core::types::{MatchId, MatchStatus, PostulationId, Status, Timestamp};
use crate::error::Entity;
use crate::store::file::StoreSnapshot;
use crate::store::{
    AssignedDelta, CommitReceipt, MatchQuery, MatchStore, MatchWrite, PostulationPatch,
    PostulationQuery, PostulationStore, StoreError, TransactionalStore, WriteBatch,
};

const POSTULATION_PREFIX: &str = "pos-";
const MATCH_PREFIX: &str = "match-";

#[derive(Debug, Default)]
struct State {
    postulations: BTreeMap<PostulationId, Postulation>,
    matches: BTreeMap<MatchId, MatchRecord>,
    /// Last sequence number handed out per prefix
    postulation_seq: u64,
    match_seq: u64,
}

/// Lock-guarded in-memory store.
///
/// Every batch is validated and applied under one write lock, so readers
/// never observe a half-applied batch. Ids are assigned as `pos-000001`,
/// `match-000001`, ... and iteration follows id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the records of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RejectedWrite`] if a record breaks a store
    /// invariant (duplicate id, capacity out of range).
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut state = State::default();

        for postulation in snapshot.postulations {
            if let Some(host) = postulation.as_host() {
                check_capacity(&postulation.id, host.remaining_capacity, host.total_capacity)?;
            }
            state.postulation_seq = state
                .postulation_seq
                .max(sequence_of(postulation.id.as_str(), POSTULATION_PREFIX));
            let id = postulation.id.clone();
            if state.postulations.insert(id.clone(), postulation).is_some() {
                return Err(StoreError::RejectedWrite {
                    id: id.to_string(),
                    reason: "duplicate postulation id in snapshot".to_string(),
                });
            }
        }

        for record in snapshot.matches {
            state.match_seq = state
                .match_seq
                .max(sequence_of(record.id.as_str(), MATCH_PREFIX));
            let id = record.id.clone();
            if state.matches.insert(id.clone(), record).is_some() {
                return Err(StoreError::RejectedWrite {
                    id: id.to_string(),
                    reason: "duplicate match id in snapshot".to_string(),
                });
            }
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Copy of every record, in id order
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let state = self.read()?;
        Ok(StoreSnapshot::new(
            state.postulations.values().cloned().collect(),
            state.matches.values().cloned().collect(),
        ))
    }

    /// Replace every record with the contents of `snapshot`
    pub(crate) fn restore(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        let rebuilt = Self::from_snapshot(snapshot)?
            .state
            .into_inner()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        *self.write()? = rebuilt;
        Ok(())
    }

    /// Number of stored postulations
    pub fn postulation_count(&self) -> usize {
        self.read().map_or(0, |state| state.postulations.len())
    }

    /// Number of stored matches
    pub fn match_count(&self) -> usize {
        self.read().map_or(0, |state| state.matches.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    // Synchronous core, shared with the file-backed store

    pub(crate) fn get_postulation_now(
        &self,
        id: &PostulationId,
    ) -> Result<Option<Postulation>, StoreError> {
        Ok(self.read()?.postulations.get(id).cloned())
    }

    pub(crate) fn query_postulations_now(
        &self,
        query: &PostulationQuery,
    ) -> Result<Vec<Postulation>, StoreError> {
        Ok(self
            .read()?
            .postulations
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    pub(crate) fn get_match_now(&self, id: &MatchId) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.read()?.matches.get(id).cloned())
    }

    pub(crate) fn query_matches_now(
        &self,
        query: &MatchQuery,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .read()?
            .matches
            .values()
            .filter(|m| query.matches(m))
            .cloned()
            .collect())
    }

    pub(crate) fn create_postulation_now(
        &self,
        new: NewPostulation,
    ) -> Result<Postulation, StoreError> {
        let mut state = self.write()?;

        let id = PostulationId::new(format!(
            "{POSTULATION_PREFIX}{:06}",
            state.postulation_seq + 1
        ));
        if let Role::Host(host) = &new.role {
            check_capacity(&id, host.remaining_capacity, host.total_capacity)?;
        }

        let now = Timestamp::assigned_now();
        let postulation = Postulation {
            id: id.clone(),
            event_id: new.event_id,
            requester_id: new.requester_id,
            status: Status::Pending,
            role: new.role,
            observation: new.observation,
            created_at: now,
            updated_at: now,
            approved_at: None,
            matched_at: None,
            cancelled_at: None,
            revision: 1,
        };

        state.postulation_seq += 1;
        state.postulations.insert(id, postulation.clone());
        Ok(postulation)
    }

    pub(crate) fn commit_now(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        let mut state = self.write()?;
        let now = Timestamp::assigned_now();

        // Stage every change on copies; nothing touches `state` until all
        // preconditions hold.
        let mut staged: BTreeMap<PostulationId, Postulation> = BTreeMap::new();
        let mut patched_order: Vec<PostulationId> = Vec::new();

        for patch in &batch.postulations {
            let original = state
                .postulations
                .get(&patch.id)
                .ok_or_else(|| StoreError::MissingRecord {
                    entity: Entity::Postulation,
                    id: patch.id.to_string(),
                })?;

            if let Some(expected) = patch.expected_revision {
                if expected != original.revision {
                    return Err(StoreError::Conflict {
                        entity: Entity::Postulation,
                        id: patch.id.to_string(),
                        expected,
                        found: original.revision,
                    });
                }
            }

            let record = staged
                .entry(patch.id.clone())
                .or_insert_with(|| original.clone());
            apply_patch(record, patch, now)?;
            if !patched_order.contains(&patch.id) {
                patched_order.push(patch.id.clone());
            }
        }

        let mut match_seq = state.match_seq;
        let mut staged_matches: Vec<MatchRecord> = Vec::new();

        for write in &batch.matches {
            match write {
                MatchWrite::Create(new) => {
                    for id in [&new.visitor_postulation_id, &new.host_postulation_id] {
                        if !state.postulations.contains_key(id) {
                            return Err(StoreError::MissingRecord {
                                entity: Entity::Postulation,
                                id: id.to_string(),
                            });
                        }
                    }
                    match_seq += 1;
                    staged_matches.push(MatchRecord {
                        id: MatchId::new(format!("{MATCH_PREFIX}{match_seq:06}")),
                        event_id: new.event_id.clone(),
                        visitor_postulation_id: new.visitor_postulation_id.clone(),
                        host_postulation_id: new.host_postulation_id.clone(),
                        visitor_requester_id: new.visitor_requester_id.clone(),
                        host_requester_id: new.host_requester_id.clone(),
                        people_count: new.people_count,
                        status: MatchStatus::Active,
                        created_at: now,
                        cancelled_at: None,
                        revision: 1,
                    });
                }
                MatchWrite::Cancel {
                    id,
                    expected_revision,
                } => {
                    let original = state.matches.get(id).ok_or_else(|| {
                        StoreError::MissingRecord {
                            entity: Entity::Match,
                            id: id.to_string(),
                        }
                    })?;
                    if let Some(expected) = *expected_revision {
                        if expected != original.revision {
                            return Err(StoreError::Conflict {
                                entity: Entity::Match,
                                id: id.to_string(),
                                expected,
                                found: original.revision,
                            });
                        }
                    }
                    let mut record = original.clone();
                    record.status = MatchStatus::Cancelled;
                    record.cancelled_at = Some(now);
                    record.revision += 1;
                    staged_matches.push(record);
                }
            }
        }

        // All checks passed: publish
        let mut receipt = CommitReceipt::default();
        for id in patched_order {
            if let Some(mut record) = staged.remove(&id) {
                record.updated_at = now;
                record.revision += 1;
                receipt.postulations.push(record.clone());
                state.postulations.insert(id, record);
            }
        }
        for record in staged_matches {
            receipt.matches.push(record.clone());
            state.matches.insert(record.id.clone(), record);
        }
        state.match_seq = match_seq;

        Ok(receipt)
    }

    pub(crate) fn update_status_now(
        &self,
        id: &PostulationId,
        status: Status,
        observation: Option<String>,
    ) -> Result<Postulation, StoreError> {
        let patch = PostulationPatch {
            id: id.clone(),
            expected_revision: None,
            status: Some(status),
            observation,
            capacity: None,
        };
        single_postulation(self.commit_now(WriteBatch::new().patch(patch))?, id)
    }

    pub(crate) fn update_host_capacity_now(
        &self,
        id: &PostulationId,
        remaining: u32,
        assigned: AssignedDelta,
    ) -> Result<Postulation, StoreError> {
        let patch = PostulationPatch {
            id: id.clone(),
            expected_revision: None,
            status: None,
            observation: None,
            capacity: None,
        }
        .capacity(remaining, assigned);
        single_postulation(self.commit_now(WriteBatch::new().patch(patch))?, id)
    }
}

fn single_postulation(receipt: CommitReceipt, id: &PostulationId) -> Result<Postulation, StoreError> {
    receipt
        .postulations
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::MissingRecord {
            entity: Entity::Postulation,
            id: id.to_string(),
        })
}

fn check_capacity(id: &PostulationId, remaining: u32, total: u32) -> Result<(), StoreError> {
    if remaining > total {
        return Err(StoreError::RejectedWrite {
            id: id.to_string(),
            reason: format!("remaining capacity {remaining} exceeds total capacity {total}"),
        });
    }
    Ok(())
}

/// Apply one patch to a staged copy, stamping status-change times
fn apply_patch(
    record: &mut Postulation,
    patch: &PostulationPatch,
    now: Timestamp,
) -> Result<(), StoreError> {
    if let Some(status) = patch.status {
        if status != record.status {
            match status {
                Status::Approved => record.approved_at = Some(now),
                Status::Matched => record.matched_at = Some(now),
                Status::Cancelled => record.cancelled_at = Some(now),
                Status::Pending | Status::Rejected | Status::Completed => {}
            }
            if record.status == Status::Matched && status == Status::Approved {
                record.matched_at = None;
            }
            record.status = status;
        }
    }

    if let Some(observation) = &patch.observation {
        record.observation = Some(observation.clone());
    }

    if let Some(change) = &patch.capacity {
        let id = record.id.clone();
        let host = record
            .as_host_mut()
            .ok_or_else(|| StoreError::RejectedWrite {
                id: id.to_string(),
                reason: "capacity update on a visitor postulation".to_string(),
            })?;
        check_capacity(&id, change.remaining, host.total_capacity)?;
        host.remaining_capacity = change.remaining;

        match &change.assigned {
            AssignedDelta::Unchanged => {}
            AssignedDelta::Add(visitor) => {
                if host.assigned_visitors.contains(visitor) {
                    return Err(StoreError::RejectedWrite {
                        id: id.to_string(),
                        reason: format!("visitor '{visitor}' is already assigned"),
                    });
                }
                host.assigned_visitors.push(visitor.clone());
            }
            AssignedDelta::Remove(visitor) => {
                let before = host.assigned_visitors.len();
                host.assigned_visitors.retain(|v| v != visitor);
                if host.assigned_visitors.len() == before {
                    return Err(StoreError::RejectedWrite {
                        id: id.to_string(),
                        reason: format!("visitor '{visitor}' is not assigned"),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Numeric suffix of an id the store assigned, or 0 for foreign ids
fn sequence_of(id: &str, prefix: &str) -> u64 {
    id.strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl PostulationStore for MemoryStore {
    async fn get_postulation(&self, id: &PostulationId) -> Result<Option<Postulation>, StoreError> {
        self.get_postulation_now(id)
    }

    async fn query_postulations(
        &self,
        query: &PostulationQuery,
    ) -> Result<Vec<Postulation>, StoreError> {
        self.query_postulations_now(query)
    }

    async fn create_postulation(&self, new: NewPostulation) -> Result<Postulation, StoreError> {
        self.create_postulation_now(new)
    }

    async fn update_status(
        &self,
        id: &PostulationId,
        status: Status,
        observation: Option<String>,
    ) -> Result<Postulation, StoreError> {
        self.update_status_now(id, status, observation)
    }

    async fn update_host_capacity(
        &self,
        id: &PostulationId,
        remaining: u32,
        assigned: AssignedDelta,
    ) -> Result<Postulation, StoreError> {
        self.update_host_capacity_now(id, remaining, assigned)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_match(&self, id: &MatchId) -> Result<Option<MatchRecord>, StoreError> {
        self.get_match_now(id)
    }

    async fn query_matches(&self, query: &MatchQuery) -> Result<Vec<MatchRecord>, StoreError> {
        self.query_matches_now(query)
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        self.commit_now(batch)
    }
}
