//! Filing and reviewing postulations.
//!
//! Requesters apply as visitor or host; the approval workflow moves
//! postulations through review statuses. Only the commit service may set
//! `matched`, so [`review`] refuses it.

use tracing::{info, warn};

use crate::core::postulation::{
    Application, HostApplication, NewPostulation, Postulation, VisitorRequest,
};
use crate::core::types::{EventId, PostulationId, RequesterId, Status};
use crate::error::{Entity, MatchError};
use crate::matching::commit::DEFAULT_MAX_ATTEMPTS;
use crate::store::{
    PostulationPatch, PostulationStore, StoreError, TransactionalStore, WriteBatch,
};
use crate::utils::validation::{validate_application, validate_text, ValidationError};

/// File a visitor postulation.
///
/// # Errors
///
/// Returns [`MatchError::Validation`] if the request is malformed or the
/// requester already has a live visitor postulation for the event.
pub async fn apply_as_visitor<S: PostulationStore + ?Sized>(
    store: &S,
    event_id: &EventId,
    requester_id: &RequesterId,
    request: VisitorRequest,
    observation: Option<String>,
) -> Result<Postulation, MatchError> {
    apply(
        store,
        event_id,
        requester_id,
        Application::Visitor(request),
        observation,
    )
    .await
}

/// File a host postulation. Remaining capacity starts at the total.
///
/// # Errors
///
/// Returns [`MatchError::Validation`] if the offer is malformed or the
/// requester already has a live host postulation for the event.
pub async fn apply_as_host<S: PostulationStore + ?Sized>(
    store: &S,
    event_id: &EventId,
    requester_id: &RequesterId,
    offer: HostApplication,
    observation: Option<String>,
) -> Result<Postulation, MatchError> {
    apply(
        store,
        event_id,
        requester_id,
        Application::Host(offer),
        observation,
    )
    .await
}

/// File either kind of postulation.
///
/// # Errors
///
/// See [`apply_as_visitor`] and [`apply_as_host`].
pub async fn apply<S: PostulationStore + ?Sized>(
    store: &S,
    event_id: &EventId,
    requester_id: &RequesterId,
    application: Application,
    observation: Option<String>,
) -> Result<Postulation, MatchError> {
    if event_id.as_str().trim().is_empty() {
        return Err(ValidationError::MissingField("event_id").into());
    }
    if requester_id.as_str().trim().is_empty() {
        return Err(ValidationError::MissingField("requester_id").into());
    }
    validate_application(&application)?;
    if let Some(text) = &observation {
        validate_text("observation", text)?;
    }

    let role = application.kind();
    let existing = store
        .query_by_requester_and_event(requester_id, event_id, role)
        .await?;
    if let Some(live) = existing
        .iter()
        .find(|p| !matches!(p.status, Status::Rejected | Status::Cancelled))
    {
        return Err(ValidationError::DuplicateApplication {
            role,
            existing: live.id.clone(),
        }
        .into());
    }

    let postulation = store
        .create_postulation(NewPostulation {
            event_id: event_id.clone(),
            requester_id: requester_id.clone(),
            role: application.into(),
            observation,
        })
        .await?;

    info!(
        id = %postulation.id,
        event = %postulation.event_id,
        role = %role,
        "Postulation filed"
    );
    Ok(postulation)
}

/// Move a postulation to a review status.
///
/// # Errors
///
/// - [`MatchError::NotFound`] if the postulation does not exist
/// - [`MatchError::InvalidState`] if the lifecycle forbids the transition,
///   or `status` is `matched`
/// - [`MatchError::Validation`] if the observation is malformed
/// - [`MatchError::Store`] if the store fails, or the record keeps changing
///   under the review
///
/// The status is written against the revision that was checked. When a match
/// commit lands in between, the review starts over from a fresh read and the
/// lifecycle check sees the new status.
pub async fn review<S: TransactionalStore + ?Sized>(
    store: &S,
    id: &PostulationId,
    status: Status,
    observation: Option<String>,
) -> Result<Postulation, MatchError> {
    if let Some(text) = &observation {
        validate_text("observation", text)?;
    }

    let mut tries = 1;
    loop {
        match try_review(store, id, status, observation.clone()).await {
            Err(MatchError::Store(err @ StoreError::Conflict { .. }))
                if tries < DEFAULT_MAX_ATTEMPTS =>
            {
                warn!(id = %id, attempt = tries, error = %err, "Review conflict, retrying");
                tries += 1;
            }
            result => return result,
        }
    }
}

async fn try_review<S: TransactionalStore + ?Sized>(
    store: &S,
    id: &PostulationId,
    status: Status,
    observation: Option<String>,
) -> Result<Postulation, MatchError> {
    let current = store
        .get_postulation(id)
        .await?
        .ok_or_else(|| MatchError::postulation_not_found(id))?;

    if !review_allowed(current.status, status) {
        return Err(MatchError::invalid_state(
            Entity::Postulation,
            id,
            current.status,
            allowed_reviews(current.status),
        ));
    }

    let patch = PostulationPatch::new(&current)
        .status(status)
        .observation(observation);
    let updated = store
        .commit(WriteBatch::new().patch(patch))
        .await?
        .postulations
        .into_iter()
        .next()
        .ok_or_else(|| MatchError::postulation_not_found(id))?;

    info!(id = %updated.id, from = %current.status, to = %updated.status, "Postulation reviewed");
    Ok(updated)
}

/// Transitions the approval workflow may make. `matched` is set and undone
/// only through match commits.
fn review_allowed(from: Status, to: Status) -> bool {
    to != Status::Matched
        && !(from == Status::Matched && to == Status::Approved)
        && from.can_transition_to(to)
}

fn allowed_reviews(from: Status) -> String {
    let allowed: Vec<String> = Status::ALL
        .into_iter()
        .filter(|&to| review_allowed(from, to))
        .map(|to| to.to_string())
        .collect();

    if allowed.is_empty() {
        "no further review".to_string()
    } else {
        allowed.join(" or ")
    }
}
