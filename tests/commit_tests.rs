//! Match commits through the public API, including concurrent callers
//! racing for the same host.

use std::collections::BTreeSet;
use std::sync::Arc;

use lodging_matcher::core::{
    EventId, GenderComposition, GenderPolicy, HostApplication, MatchStatus, PostulationId,
    RequesterId, Status, VisitorPreferences, VisitorRequest,
};
use lodging_matcher::intake;
use lodging_matcher::matching::{CommitConfig, MatchCommitService, SuggestionEngine};
use lodging_matcher::store::{MatchQuery, MatchStore, MemoryStore, PostulationStore, StoreSnapshot};
use lodging_matcher::MatchError;

const EVENT: &str = "fiesta-2025";

fn demo_store() -> MemoryStore {
    MemoryStore::from_snapshot(StoreSnapshot::load_embedded().unwrap()).unwrap()
}

fn solo_traveller() -> VisitorRequest {
    VisitorRequest {
        people_count: 1,
        ages: vec![25],
        gender: GenderComposition::Female,
        arrival: None,
        departure: None,
        special_needs: None,
        preferences: VisitorPreferences::default(),
    }
}

fn shared_flat(capacity: u32) -> HostApplication {
    HostApplication {
        total_capacity: capacity,
        address: "Avenida de Carlos III 40".to_string(),
        gender_policy: GenderPolicy::Both,
        accepts_children: false,
        accepts_pets: false,
        amenities: BTreeSet::new(),
        available_from: None,
        available_until: None,
        distance_meters: Some(1500),
    }
}

async fn remaining(store: &MemoryStore, host: &PostulationId) -> (u32, usize) {
    let offer = store
        .get_postulation(host)
        .await
        .unwrap()
        .unwrap()
        .as_host()
        .cloned()
        .unwrap();
    (offer.remaining_capacity, offer.assigned_visitors.len())
}

#[tokio::test]
async fn test_best_suggestion_can_be_committed_and_cancelled() {
    let store = demo_store();
    let visitor = PostulationId::new("pos-000005");

    let hosts = SuggestionEngine::new(&store)
        .suggest_hosts_for_visitor(&visitor)
        .await
        .unwrap();
    let best = &hosts[0];
    assert_eq!(best.host.id.as_str(), "pos-000001");
    assert_eq!(best.score.total, 100);

    let service = MatchCommitService::new(&store);
    let record = service.create_match(&visitor, &best.host.id).await.unwrap();
    assert_eq!(record.people_count, 3);
    assert_eq!(record.event_id.as_str(), EVENT);
    assert_eq!(remaining(&store, &best.host.id).await, (1, 1));

    let visitor_after = store.get_postulation(&visitor).await.unwrap().unwrap();
    assert_eq!(visitor_after.status, Status::Matched);

    // A matched visitor is no longer offered to hosts
    let visitors = SuggestionEngine::new(&store)
        .suggest_visitors_for_host(&best.host.id)
        .await
        .unwrap();
    assert!(visitors.iter().all(|s| s.visitor.id != visitor));

    let cancelled = service.cancel_match(&record.id).await.unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);
    assert_eq!(remaining(&store, &best.host.id).await, (4, 0));

    let host_after = store.get_postulation(&best.host.id).await.unwrap().unwrap();
    assert_eq!(host_after.status, Status::Approved);

    let active = store
        .query_matches(&MatchQuery {
            status: Some(MatchStatus::Active),
            ..MatchQuery::default()
        })
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_pending_visitor_leaves_store_untouched() {
    let store = demo_store();
    let before = store.snapshot().unwrap();

    let err = MatchCommitService::new(&store)
        .create_match(&PostulationId::new("pos-000008"), &PostulationId::new("pos-000001"))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::InvalidState { .. }));

    let after = store.snapshot().unwrap();
    assert_eq!(before.postulations, after.postulations);
    assert_eq!(after.matches.len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_creates_for_one_host_pick_a_single_winner() {
    let store = Arc::new(demo_store());
    let host = PostulationId::new("pos-000001");

    // 3 and 2 people against 4 places: only one of them fits
    let mut handles = Vec::new();
    for visitor in ["pos-000005", "pos-000006"] {
        let store = Arc::clone(&store);
        let host = host.clone();
        handles.push(tokio::spawn(async move {
            MatchCommitService::new(store.as_ref())
                .create_match(&PostulationId::new(visitor), &host)
                .await
        }));
    }

    let mut people = Vec::new();
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(record) => people.push(record.people_count),
            Err(MatchError::Capacity { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(people.len(), 1);
    assert_eq!(refused, 1);
    assert_eq!(remaining(&store, &host).await, (4 - people[0], 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_never_overbook() {
    let store = Arc::new(MemoryStore::new());
    let event = EventId::new("sanfermin-2025");

    let host = intake::apply_as_host(
        store.as_ref(),
        &event,
        &RequesterId::new("host"),
        shared_flat(10),
        None,
    )
    .await
    .unwrap();
    intake::review(store.as_ref(), &host.id, Status::Approved, None)
        .await
        .unwrap();

    let mut visitors = Vec::new();
    for i in 0..20 {
        let visitor = intake::apply_as_visitor(
            store.as_ref(),
            &event,
            &RequesterId::new(format!("guest-{i}")),
            solo_traveller(),
            None,
        )
        .await
        .unwrap();
        intake::review(store.as_ref(), &visitor.id, Status::Approved, None)
            .await
            .unwrap();
        visitors.push(visitor.id);
    }

    // Enough attempts that every loser ends on a capacity refusal, not a conflict
    let config = CommitConfig { max_attempts: 50 };
    let mut handles = Vec::new();
    for visitor in visitors {
        let store = Arc::clone(&store);
        let host = host.id.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            MatchCommitService::with_config(store.as_ref(), config)
                .create_match(&visitor, &host)
                .await
        }));
    }

    let mut created = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(MatchError::Capacity { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 10);
    assert_eq!(refused, 10);
    assert_eq!(remaining(&store, &host.id).await, (0, 10));

    let matches = store
        .query_matches(&MatchQuery {
            event_id: Some(event),
            ..MatchQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(matches.len(), 10);
    let lodged: BTreeSet<_> = matches.iter().map(|m| &m.visitor_postulation_id).collect();
    assert_eq!(lodged.len(), 10);
}
