//! HTTP API tests driving the router directly, without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use lodging_matcher::store::{MemoryStore, StoreSnapshot};
use lodging_matcher::web::server::{create_router, AppState, MAX_BODY_SIZE};

fn demo_router() -> Router {
    let store = MemoryStore::from_snapshot(StoreSnapshot::load_embedded().unwrap()).unwrap();
    create_router(Arc::new(AppState::new(Arc::new(store))))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = demo_router();
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = demo_router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
}

#[tokio::test]
async fn test_list_postulations_filters_by_role_and_status() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/events/fiesta-2025/postulations?role=host&status=approved",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let ids: Vec<&str> = body["postulations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["pos-000001", "pos-000002", "pos-000003"]);
}

#[tokio::test]
async fn test_visitor_suggestions_ranked() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/visitors/pos-000005/suggestions?min_score=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let suggestions = body["suggestions"].as_array().unwrap();
    assert_eq!(suggestions[0]["host"]["id"], "pos-000001");
    assert_eq!(suggestions[0]["score"]["total"], 100);

    // The two-place host cannot take a group of three
    assert!(suggestions.iter().all(|s| s["host"]["id"] != "pos-000002"));

    let totals: Vec<u64> = suggestions
        .iter()
        .map(|s| s["score"]["total"].as_u64().unwrap())
        .collect();
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_suggestions_for_host_as_visitor_is_not_found() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/visitors/pos-000001/suggestions",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}

#[tokio::test]
async fn test_event_suggestions_pair_each_visitor_once() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/events/fiesta-2025/suggestions",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let pairs = body["suggestions"].as_array().unwrap();
    let mut visitors: Vec<&str> = pairs
        .iter()
        .map(|p| p["visitor"]["id"].as_str().unwrap())
        .collect();
    visitors.sort_unstable();
    visitors.dedup();
    assert_eq!(visitors.len(), pairs.len());
    assert!(pairs
        .iter()
        .any(|p| p["visitor"]["id"] == "pos-000005" && p["host"]["id"] == "pos-000001"));
}

#[tokio::test]
async fn test_score_endpoint() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/score?visitor=pos-000005&host=pos-000002",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"]["total"], 0);
    assert_eq!(body["score"]["disqualified"]["reason"], "insufficient_capacity");
    assert_eq!(body["explanation"]["cons"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_and_cancel_match() {
    let app = demo_router();
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/matches",
        Some(json!({"visitor_id": "pos-000005", "host_id": "pos-000001"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "active");
    assert_eq!(created["people_count"], 3);
    let match_id = created["id"].as_str().unwrap().to_string();

    // Only one place left for a group of two
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/matches",
        Some(json!({"visitor_id": "pos-000006", "host_id": "pos-000001"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "capacity");
    assert_eq!(body["details"]["available"], 1);
    assert_eq!(body["details"]["requested"], 2);

    let (status, body) = send(&app, Method::GET, "/api/events/fiesta-2025/matches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let uri = format!("/api/matches/{match_id}/cancel");
    let (status, cancelled) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "invalid_state");
    assert_eq!(body["details"]["current"], "cancelled");
}

#[tokio::test]
async fn test_match_across_events_is_unprocessable() {
    let app = demo_router();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/matches",
        Some(json!({"visitor_id": "pos-000005", "host_id": "pos-000009"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_type"], "validation");
}

#[tokio::test]
async fn test_apply_then_review() {
    let app = demo_router();
    let (status, filed) = send(
        &app,
        Method::POST,
        "/api/events/fiesta-2025/postulations",
        Some(json!({
            "requester_id": "user-200",
            "application": {
                "type": "host",
                "total_capacity": 3,
                "address": "Calle Estafeta 7",
                "gender_policy": "both",
                "accepts_children": true
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filed["status"], "pending");
    assert_eq!(filed["role"]["remaining_capacity"], 3);

    let uri = format!("/api/postulations/{}/review", filed["id"].as_str().unwrap());
    let (status, reviewed) = send(&app, Method::POST, &uri, Some(json!({"status": "approved"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let (status, body) = send(&app, Method::POST, &uri, Some(json!({"status": "matched"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "invalid_state");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = demo_router();
    let padding = "x".repeat(MAX_BODY_SIZE + 1);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/matches",
        Some(json!({"visitor_id": padding, "host_id": "pos-000001"})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
