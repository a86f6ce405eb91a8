use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db::{MatchRegistry, SnapshotStore};
use crate::error::AppError;
use crate::ingest::into_batch;
use crate::mail::CodeProvider;
use crate::state::cycle::{CycleState, CycleStatus};
use crate::types::{IngestRequest, Match, MatchSummary, TicketRow};

#[derive(Clone)]
pub struct ApiState {
    pub registry: MatchRegistry,
    pub snapshots: SnapshotStore,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub cycle: Arc<CycleState>,
    pub codes: Arc<dyn CodeProvider>,
    pub code_mailbox: String,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/tickets", post(post_tickets))
        .route("/api/last-tickets/:title", get(get_last_tickets))
        .route("/api/matches", get(get_matches))
        .route("/api/get_code", get(get_code))
        .route("/api/cycle", get(get_cycle))
        .route("/api/cycle/start", post(start_cycle))
        .route("/api/cycle/pause", post(pause_cycle))
        .route("/api/cycle/resume", post(resume_cycle))
        .route("/getdata", get(get_data))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CodeResponse {
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub total_matches: i64,
    pub batches_ingested: u64,
    pub rows_ingested: u64,
    pub rows_dropped: u64,
    pub last_ingest_ts: Option<i64>,
    pub cycle: CycleStatus,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn post_tickets(
    State(state): State<ApiState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let started = Instant::now();

    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let (new_match, tickets) = into_batch(req)?;
    let match_id = state.registry.upsert_match(&new_match).await?;
    let outcome = state.snapshots.ingest_batch(match_id, &tickets).await?;

    state.health.record_batch(&outcome);
    state.latency.record(started.elapsed());

    Ok(format!(
        "Saved {} tickets with timestamp: {}",
        outcome.inserted, outcome.batch_ts
    ))
}

/// 404 for an unknown title; an empty array for a known match with no batches yet.
async fn get_last_tickets(
    State(state): State<ApiState>,
    Path(title): Path<String>,
) -> Result<Json<Vec<TicketRow>>, AppError> {
    let rows = state
        .snapshots
        .historical_snapshot(&title)
        .await?
        .map(|s| s.rows)
        .unwrap_or_default();
    Ok(Json(rows))
}

async fn get_matches(State(state): State<ApiState>) -> Result<Json<Vec<Match>>, AppError> {
    Ok(Json(state.registry.list_matches().await?))
}

async fn get_data(State(state): State<ApiState>) -> Result<Json<Vec<MatchSummary>>, AppError> {
    Ok(Json(state.snapshots.latest_snapshots_for_all_matches().await?))
}

async fn get_code(State(state): State<ApiState>) -> Result<Json<CodeResponse>, AppError> {
    let code = state.codes.fetch_latest_code(&state.code_mailbox).await?;
    Ok(Json(CodeResponse { code }))
}

async fn get_cycle(State(state): State<ApiState>) -> Json<CycleStatus> {
    Json(state.cycle.status())
}

async fn start_cycle(State(state): State<ApiState>) -> Json<CycleStatus> {
    let status = state.cycle.start_cycle();
    info!(cycle = status.cycle, "scrape cycle started");
    Json(status)
}

async fn pause_cycle(State(state): State<ApiState>) -> Json<CycleStatus> {
    let status = state.cycle.pause();
    info!(cycle = status.cycle, "scrape cycle paused");
    Json(status)
}

async fn resume_cycle(State(state): State<ApiState>) -> Json<CycleStatus> {
    let status = state.cycle.resume();
    info!(cycle = status.cycle, "scrape cycle resumed");
    Json(status)
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let total_matches = state.registry.count().await?;
    let last = state.health.last_ingest_ts();
    Ok(Json(HealthResponse {
        total_matches,
        batches_ingested: state.health.batches_ingested(),
        rows_ingested: state.health.rows_ingested(),
        rows_dropped: state.health.rows_dropped(),
        last_ingest_ts: (last > 0).then_some(last),
        cycle: state.cycle.status(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let percentiles = state.latency.percentiles_ms();
    Json(LatencyResponse {
        p50_ms: percentiles.map(|p| p.0),
        p95_ms: percentiles.map(|p| p.1),
        p99_ms: percentiles.map(|p| p.2),
        sample_count: state.latency.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
