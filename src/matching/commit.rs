use std::future::Future;

use tracing::{info, warn};

use crate::core::pairing::{MatchRecord, NewMatch};
use crate::core::postulation::{HostOffer, Postulation, VisitorRequest};
use crate::core::types::{MatchId, PostulationId, RoleKind, Status};
use crate::error::{Entity, MatchError};
use crate::store::{
    AssignedDelta, MatchWrite, PostulationPatch, StoreError, TransactionalStore, WriteBatch,
};
use crate::utils::validation::{check_same_event, ValidationError};

/// Default number of times a commit is attempted when it loses a race
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct CommitConfig {
    /// Attempts per operation when the store reports a revision conflict
    pub max_attempts: u32,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Creates and cancels matches.
///
/// Each operation reads the records it needs, checks every precondition, then
/// hands the store one [`WriteBatch`] carrying the revisions it read. The store
/// applies the whole batch or nothing, so a match never exists without the
/// status and capacity changes that go with it. If another writer touched one
/// of the records in between, the operation starts over from fresh reads.
pub struct MatchCommitService<'a, S: TransactionalStore + ?Sized> {
    store: &'a S,
    config: CommitConfig,
}

impl<'a, S: TransactionalStore + ?Sized> MatchCommitService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            config: CommitConfig::default(),
        }
    }

    pub fn with_config(store: &'a S, config: CommitConfig) -> Self {
        Self { store, config }
    }

    /// Pair a visitor with a host.
    ///
    /// Both postulations move to `matched`, the host loses the visitor's
    /// people count from its remaining capacity and gains the visitor in its
    /// assigned list.
    ///
    /// # Errors
    ///
    /// - [`MatchError::NotFound`] if either postulation is missing
    /// - [`MatchError::Validation`] if the roles are wrong or the events differ
    /// - [`MatchError::InvalidState`] if the visitor is not approved, or the
    ///   host is neither approved nor matched
    /// - [`MatchError::Capacity`] if the host has too few places left
    /// - [`MatchError::Store`] if the store fails or conflicts persist
    pub async fn create_match(
        &self,
        visitor_id: &PostulationId,
        host_id: &PostulationId,
    ) -> Result<MatchRecord, MatchError> {
        let record = self
            .retrying("create_match", || self.try_create(visitor_id, host_id))
            .await?;

        info!(
            match_id = %record.id,
            visitor = %record.visitor_postulation_id,
            host = %record.host_postulation_id,
            people = record.people_count,
            "Match created"
        );
        Ok(record)
    }

    /// Undo a match: both postulations return to `approved` (the host only
    /// once nobody else is lodged there) and the places go back to the host.
    ///
    /// # Errors
    ///
    /// - [`MatchError::NotFound`] if the match or one of its postulations is missing
    /// - [`MatchError::InvalidState`] if the match is already cancelled or a
    ///   postulation has moved past `matched`
    /// - [`MatchError::Store`] if the store fails or conflicts persist
    pub async fn cancel_match(&self, match_id: &MatchId) -> Result<MatchRecord, MatchError> {
        let record = self
            .retrying("cancel_match", || self.try_cancel(match_id))
            .await?;

        info!(
            match_id = %record.id,
            visitor = %record.visitor_postulation_id,
            host = %record.host_postulation_id,
            people = record.people_count,
            "Match cancelled"
        );
        Ok(record)
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, MatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MatchError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(MatchError::Store(err @ StoreError::Conflict { .. })) if tries < max_attempts => {
                    warn!(operation, attempt = tries, error = %err, "Commit conflict, retrying");
                    tries += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_create(
        &self,
        visitor_id: &PostulationId,
        host_id: &PostulationId,
    ) -> Result<MatchRecord, MatchError> {
        let visitor = self.load(visitor_id).await?;
        let host = self.load(host_id).await?;

        let request = visitor_request(&visitor)?;
        let offer = host_offer(&host)?;
        check_same_event(&visitor.event_id, &host.event_id)?;

        if visitor.status != Status::Approved {
            return Err(MatchError::invalid_state(
                Entity::Postulation,
                &visitor.id,
                visitor.status,
                "approved",
            ));
        }
        if !matches!(host.status, Status::Approved | Status::Matched) {
            return Err(MatchError::invalid_state(
                Entity::Postulation,
                &host.id,
                host.status,
                "approved or matched",
            ));
        }
        if !offer.can_take(request.people_count) {
            return Err(MatchError::Capacity {
                host_id: host.id.clone(),
                available: offer.remaining_capacity,
                requested: request.people_count,
            });
        }

        let batch = WriteBatch::new()
            .write_match(MatchWrite::Create(NewMatch {
                event_id: visitor.event_id.clone(),
                visitor_postulation_id: visitor.id.clone(),
                host_postulation_id: host.id.clone(),
                visitor_requester_id: visitor.requester_id.clone(),
                host_requester_id: host.requester_id.clone(),
                people_count: request.people_count,
            }))
            .patch(PostulationPatch::new(&visitor).status(Status::Matched))
            .patch(
                PostulationPatch::new(&host).status(Status::Matched).capacity(
                    offer.remaining_capacity - request.people_count,
                    AssignedDelta::Add(visitor.id.clone()),
                ),
            );

        let receipt = self.store.commit(batch).await?;
        receipt.matches.into_iter().next().ok_or_else(|| {
            MatchError::Store(StoreError::Unavailable(
                "commit returned no match record".to_string(),
            ))
        })
    }

    async fn try_cancel(&self, match_id: &MatchId) -> Result<MatchRecord, MatchError> {
        let record = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| MatchError::NotFound {
                entity: Entity::Match,
                id: match_id.to_string(),
            })?;
        if !record.is_active() {
            return Err(MatchError::invalid_state(
                Entity::Match,
                &record.id,
                record.status,
                "active",
            ));
        }

        let visitor = self.load(&record.visitor_postulation_id).await?;
        let host = self.load(&record.host_postulation_id).await?;
        let offer = host_offer(&host)?;

        for postulation in [&visitor, &host] {
            if postulation.status != Status::Matched {
                return Err(MatchError::invalid_state(
                    Entity::Postulation,
                    &postulation.id,
                    postulation.status,
                    "matched",
                ));
            }
        }

        let still_lodging = offer
            .assigned_visitors
            .iter()
            .any(|id| id != &visitor.id);
        let mut host_patch = PostulationPatch::new(&host).capacity(
            offer.remaining_capacity.saturating_add(record.people_count),
            AssignedDelta::Remove(visitor.id.clone()),
        );
        if !still_lodging {
            host_patch = host_patch.status(Status::Approved);
        }

        let batch = WriteBatch::new()
            .write_match(MatchWrite::Cancel {
                id: record.id.clone(),
                expected_revision: Some(record.revision),
            })
            .patch(PostulationPatch::new(&visitor).status(Status::Approved))
            .patch(host_patch);

        let receipt = self.store.commit(batch).await?;
        receipt.matches.into_iter().next().ok_or_else(|| {
            MatchError::Store(StoreError::Unavailable(
                "commit returned no match record".to_string(),
            ))
        })
    }

    async fn load(&self, id: &PostulationId) -> Result<Postulation, MatchError> {
        self.store
            .get_postulation(id)
            .await?
            .ok_or_else(|| MatchError::postulation_not_found(id))
    }
}

fn visitor_request(postulation: &Postulation) -> Result<&VisitorRequest, ValidationError> {
    postulation
        .as_visitor()
        .ok_or_else(|| ValidationError::WrongRole {
            id: postulation.id.clone(),
            expected: RoleKind::Visitor,
            found: postulation.role_kind(),
        })
}

fn host_offer(postulation: &Postulation) -> Result<&HostOffer, ValidationError> {
    postulation
        .as_host()
        .ok_or_else(|| ValidationError::WrongRole {
            id: postulation.id.clone(),
            expected: RoleKind::Host,
            found: postulation.role_kind(),
        })
}
