//! Builders for postulations used across unit tests.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::core::postulation::{
    HostOffer, NewPostulation, Postulation, Role, VisitorPreferences, VisitorRequest,
};
use crate::core::types::{
    EventId, GenderComposition, GenderPolicy, PostulationId, RequesterId, Status, Timestamp,
};
use crate::store::PostulationStore;

pub(crate) const EVENT: &str = "fiesta-2025";

pub(crate) fn july(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
}

/// Adults only, mixed, July 10 to 12, no pets
pub(crate) fn visitor_request(people: u32) -> VisitorRequest {
    VisitorRequest {
        people_count: people,
        ages: vec![30; people as usize],
        gender: GenderComposition::Mixed,
        arrival: Some(july(10)),
        departure: Some(july(12)),
        special_needs: None,
        preferences: VisitorPreferences::default(),
    }
}

/// Any gender, children welcome, July 1 to 31, 800 m away
pub(crate) fn host_offer(capacity: u32) -> HostOffer {
    HostOffer {
        total_capacity: capacity,
        remaining_capacity: capacity,
        address: "Calle Mayor 12".to_string(),
        gender_policy: GenderPolicy::Both,
        accepts_children: true,
        accepts_pets: false,
        amenities: ["wifi", "breakfast"]
            .into_iter()
            .map(String::from)
            .collect::<BTreeSet<_>>(),
        available_from: Some(july(1)),
        available_until: Some(july(31)),
        distance_meters: Some(800),
        assigned_visitors: Vec::new(),
    }
}

pub(crate) fn postulation(id: &str, status: Status, role: Role) -> Postulation {
    let now = Timestamp::assigned_now();
    Postulation {
        id: PostulationId::new(id),
        event_id: EventId::new(EVENT),
        requester_id: RequesterId::new(format!("user-{id}")),
        status,
        role,
        observation: None,
        created_at: now,
        updated_at: now,
        approved_at: None,
        matched_at: None,
        cancelled_at: None,
        revision: 1,
    }
}

pub(crate) fn visitor(id: &str, request: VisitorRequest) -> Postulation {
    postulation(id, Status::Approved, Role::Visitor(request))
}

pub(crate) fn host(id: &str, offer: HostOffer) -> Postulation {
    postulation(id, Status::Approved, Role::Host(offer))
}

pub(crate) fn new_postulation(requester: &str, role: Role) -> NewPostulation {
    NewPostulation {
        event_id: EventId::new(EVENT),
        requester_id: RequesterId::new(requester),
        role,
        observation: None,
    }
}

/// Create a postulation through the store and approve it
pub(crate) async fn approved<S: PostulationStore + ?Sized>(
    store: &S,
    requester: &str,
    role: Role,
) -> Postulation {
    let created = store
        .create_postulation(new_postulation(requester, role))
        .await
        .unwrap();
    store
        .update_status(&created.id, Status::Approved, None)
        .await
        .unwrap()
}
