use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::core::postulation::Application;
use crate::core::types::{
    EventId, MatchId, MatchStatus, PostulationId, RequesterId, RoleKind, Status,
};
use crate::error::MatchError;
use crate::intake;
use crate::matching::{
    CompatibilityScore, Explanation, MatchCommitService, MatchingConfig, SuggestionEngine,
};
use crate::store::{
    FileStore, MatchQuery, MemoryStore, PostulationQuery, StoreError, StoreSnapshot,
    TransactionalStore,
};

/// Request body size limit
pub const MAX_BODY_SIZE: usize = 64 * 1024; // 64KB

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Concurrent requests served before callers queue
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Largest `limit` a suggestion request may ask for
pub const MAX_SUGGESTION_LIMIT: usize = 100;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn TransactionalStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TransactionalStore>) -> Self {
        Self { store }
    }
}

/// Error body returned by every failing endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    // Log detailed error server-side for debugging (not exposed to client)
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

/// A [`MatchError`] on its way out as an HTTP response
pub struct ApiError(MatchError);

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(MatchError::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let error_type = err.error_type();
        let (status, body) = match &err {
            MatchError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: err.to_string(),
                    error_type: error_type.to_string(),
                    details: None,
                },
            ),
            MatchError::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: err.to_string(),
                    error_type: error_type.to_string(),
                    details: None,
                },
            ),
            MatchError::InvalidState {
                current, expected, ..
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: err.to_string(),
                    error_type: error_type.to_string(),
                    details: Some(serde_json::json!({
                        "current": current,
                        "expected": expected,
                    })),
                },
            ),
            MatchError::Capacity {
                available,
                requested,
                ..
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: err.to_string(),
                    error_type: error_type.to_string(),
                    details: Some(serde_json::json!({
                        "available": available,
                        "requested": requested,
                    })),
                },
            ),
            MatchError::Store(StoreError::Conflict { .. }) => (
                StatusCode::CONFLICT,
                create_safe_error_response(
                    error_type,
                    "The records changed while the request was processed; try again",
                    Some(&err.to_string()),
                ),
            ),
            MatchError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                create_safe_error_response(
                    error_type,
                    "Storage is temporarily unavailable",
                    Some(&err.to_string()),
                ),
            ),
        };

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created, the data file
/// cannot be opened, or the server fails to start.
pub fn run(args: ServeArgs, data: &std::path::Path) -> anyhow::Result<()> {
    let store: Arc<dyn TransactionalStore> = if args.demo {
        Arc::new(MemoryStore::from_snapshot(StoreSnapshot::load_embedded()?)?)
    } else {
        Arc::new(FileStore::open(data)?)
    };

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, store).await })
}

/// Create the application router with all routes and the security layers
/// that do not depend on the peer address.
///
/// [`run`] adds per-IP rate limiting on top, which needs connection info
/// and is therefore left out here.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/events/{event_id}/postulations",
            get(list_postulations_handler).post(apply_handler),
        )
        .route("/api/events/{event_id}/matches", get(list_matches_handler))
        .route(
            "/api/events/{event_id}/suggestions",
            get(event_suggestions_handler),
        )
        .route("/api/postulations/{id}/review", post(review_handler))
        .route(
            "/api/visitors/{id}/suggestions",
            get(visitor_suggestions_handler),
        )
        .route("/api/hosts/{id}/suggestions", get(host_suggestions_handler))
        .route("/api/score", get(score_handler))
        .route("/api/matches", post(create_match_handler))
        .route("/api/matches/{id}/cancel", post(cancel_match_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // Security headers for browser protection
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("no-referrer"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("cache-control"),
                    HeaderValue::from_static("no-store"),
                ))
                // Request timeout to prevent slow client attacks
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                ))
                // Limit concurrent requests to prevent DOS
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
}

async fn run_server(args: ServeArgs, store: Arc<dyn TransactionalStore>) -> anyhow::Result<()> {
    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limiting configuration"))?;

    let app = create_router(Arc::new(AppState::new(store))).layer(GovernorLayer {
        config: Arc::new(governor_conf),
    });

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting lodging-matcher API at http://{addr}");
    if args.demo {
        println!("Serving the embedded demo event; changes are kept in memory only");
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct PostulationFilter {
    role: Option<RoleKind>,
    status: Option<Status>,
}

async fn list_postulations_handler(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(filter): Query<PostulationFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut query = PostulationQuery::for_event(&EventId::new(event_id));
    query.role = filter.role;
    if let Some(status) = filter.status {
        query = query.with_statuses(&[status]);
    }

    let postulations = state.store.query_postulations(&query).await?;
    Ok(Json(serde_json::json!({
        "count": postulations.len(),
        "postulations": postulations,
    })))
}

#[derive(Deserialize)]
struct ApplyRequest {
    requester_id: String,
    application: Application,
    #[serde(default)]
    observation: Option<String>,
}

async fn apply_handler(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(request): Json<ApplyRequest>,
) -> ApiResult<impl IntoResponse> {
    let postulation = intake::apply(
        state.store.as_ref(),
        &EventId::new(event_id),
        &RequesterId::new(request.requester_id),
        request.application,
        request.observation,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(postulation)))
}

#[derive(Deserialize)]
struct ReviewRequest {
    status: Status,
    #[serde(default)]
    observation: Option<String>,
}

async fn review_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let postulation = intake::review(
        state.store.as_ref(),
        &PostulationId::new(id),
        request.status,
        request.observation,
    )
    .await?;
    Ok(Json(postulation))
}

#[derive(Deserialize)]
struct MatchFilter {
    #[serde(default)]
    all: bool,
}

async fn list_matches_handler(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(filter): Query<MatchFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let query = MatchQuery {
        event_id: Some(EventId::new(event_id)),
        status: if filter.all { None } else { Some(MatchStatus::Active) },
        ..MatchQuery::default()
    };
    let matches = state.store.query_matches(&query).await?;
    Ok(Json(serde_json::json!({
        "count": matches.len(),
        "matches": matches,
    })))
}

/// Query parameters shared by the suggestion endpoints
#[derive(Deserialize)]
struct SuggestionParams {
    /// Drop suggestions scoring below this (0-100)
    min_score: Option<u8>,
    /// Maximum number of suggestions (capped at [`MAX_SUGGESTION_LIMIT`])
    limit: Option<usize>,
}

impl SuggestionParams {
    fn config(&self) -> MatchingConfig {
        MatchingConfig {
            min_score: self.min_score.unwrap_or_default().min(100),
            limit: Some(
                self.limit
                    .unwrap_or(MAX_SUGGESTION_LIMIT)
                    .min(MAX_SUGGESTION_LIMIT),
            ),
        }
    }
}

async fn visitor_suggestions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SuggestionParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let engine = SuggestionEngine::with_config(state.store.as_ref(), params.config());
    let suggestions = engine
        .suggest_hosts_for_visitor(&PostulationId::new(id.as_str()))
        .await?;
    Ok(Json(serde_json::json!({
        "visitor": id,
        "count": suggestions.len(),
        "suggestions": suggestions,
    })))
}

async fn host_suggestions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SuggestionParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let engine = SuggestionEngine::with_config(state.store.as_ref(), params.config());
    let suggestions = engine
        .suggest_visitors_for_host(&PostulationId::new(id.as_str()))
        .await?;
    Ok(Json(serde_json::json!({
        "host": id,
        "count": suggestions.len(),
        "suggestions": suggestions,
    })))
}

async fn event_suggestions_handler(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(params): Query<SuggestionParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let engine = SuggestionEngine::with_config(state.store.as_ref(), params.config());
    let pairs = engine
        .suggest_for_event(&EventId::new(event_id.as_str()))
        .await?;
    Ok(Json(serde_json::json!({
        "event": event_id,
        "count": pairs.len(),
        "suggestions": pairs,
    })))
}

#[derive(Deserialize)]
struct ScoreParams {
    visitor: String,
    host: String,
}

async fn score_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScoreParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let visitor_id = PostulationId::new(params.visitor);
    let host_id = PostulationId::new(params.host);

    let visitor = state
        .store
        .get_postulation(&visitor_id)
        .await?
        .ok_or_else(|| MatchError::postulation_not_found(&visitor_id))?;
    let host = state
        .store
        .get_postulation(&host_id)
        .await?
        .ok_or_else(|| MatchError::postulation_not_found(&host_id))?;

    Ok(Json(serde_json::json!({
        "visitor": visitor_id,
        "host": host_id,
        "score": CompatibilityScore::calculate(&visitor, &host),
        "explanation": Explanation::analyze(&visitor, &host),
    })))
}

#[derive(Deserialize)]
struct CreateMatchRequest {
    visitor_id: String,
    host_id: String,
}

async fn create_match_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMatchRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = MatchCommitService::new(state.store.as_ref())
        .create_match(
            &PostulationId::new(request.visitor_id),
            &PostulationId::new(request.host_id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn cancel_match_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = MatchCommitService::new(state.store.as_ref())
        .cancel_match(&MatchId::new(id))
        .await?;
    Ok(Json(record))
}
