//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServiceState>`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::cache::MarketCache;
use crate::engine::coordinator::RefreshCoordinator;
use crate::market;
use crate::types::{
    CacheEntry, DataDomain, DomainPayload, RefreshRun, RefreshTrigger, SourceKind,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServiceState {
    pub cache: Arc<MarketCache>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub service_name: String,
    pub max_age_secs: u64,
    pub started_at: DateTime<Utc>,
}

impl ServiceState {
    pub fn new(
        cache: Arc<MarketCache>,
        coordinator: Arc<RefreshCoordinator>,
        service_name: String,
        max_age_secs: u64,
    ) -> Self {
        Self {
            cache,
            coordinator,
            service_name,
            max_age_secs,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<ServiceState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub market_status: String,
    pub ist_time: String,
    pub uptime_secs: i64,
    pub domains_cached: usize,
    pub stale_domains: Vec<String>,
    pub last_update: Option<DateTime<Utc>>,
    /// `last_update` rendered on the IST wall clock for display.
    pub last_update_ist: Option<String>,
    pub last_run: Option<RunSummary>,
}

/// Condensed view of the most recent refresh run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub triggered_by: RefreshTrigger,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub synthetic_domains: usize,
}

impl From<&RefreshRun> for RunSummary {
    fn from(run: &RefreshRun) -> Self {
        Self {
            id: run.id,
            triggered_by: run.triggered_by,
            completed_at: run.completed_at,
            duration_ms: run.duration_ms(),
            synthetic_domains: run.synthetic_count(),
        }
    }
}

/// One cached domain with its freshness annotations.
#[derive(Debug, Clone, Serialize)]
pub struct DomainView {
    pub domain: String,
    pub label: String,
    pub source_used: SourceKind,
    pub fetched_at: DateTime<Utc>,
    pub age_secs: i64,
    pub stale: bool,
    pub records: usize,
    pub payload: DomainPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn domain_view(entry: &CacheEntry, max_age_secs: u64, now: DateTime<Utc>) -> DomainView {
    DomainView {
        domain: entry.domain.as_str().to_string(),
        label: entry.domain.label().to_string(),
        source_used: entry.source_used,
        fetched_at: entry.fetched_at,
        age_secs: entry.age_secs_at(now),
        stale: entry.is_stale_at(max_age_secs, now),
        records: entry.payload.record_count(),
        payload: entry.payload.clone(),
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let now = Utc::now();
    let now_ist = market::now_ist();
    let snapshot = state.cache.snapshot().await;
    let stale_domains: Vec<String> = snapshot
        .iter()
        .filter(|e| e.is_stale_at(state.max_age_secs, now))
        .map(|e| e.domain.as_str().to_string())
        .collect();

    let last_update = state.cache.last_update().await;
    Json(StatusResponse {
        service: state.service_name.clone(),
        market_status: market::market_status_at(now_ist).to_string(),
        ist_time: market::format_ist(now),
        uptime_secs: (now - state.started_at).num_seconds(),
        domains_cached: snapshot.len(),
        stale_domains,
        last_update,
        last_update_ist: last_update.map(market::format_ist),
        last_run: state.cache.last_run().await.map(|r| RunSummary::from(&r)),
    })
}

/// GET /api/snapshot
pub async fn get_snapshot(State(state): State<AppState>) -> Json<Vec<DomainView>> {
    let now = Utc::now();
    let snapshot = state.cache.snapshot().await;
    Json(
        snapshot
            .iter()
            .map(|e| domain_view(e, state.max_age_secs, now))
            .collect(),
    )
}

/// GET /api/domains/:domain
pub async fn get_domain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DomainView>, (StatusCode, Json<ErrorResponse>)> {
    let domain: DataDomain = match name.parse() {
        Ok(d) => d,
        Err(_) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Unknown domain: {name}"),
                }),
            ))
        }
    };

    match state.cache.get(domain).await {
        Some(entry) => Ok(Json(domain_view(&entry, state.max_age_secs, Utc::now()))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No data cached yet for {domain}"),
            }),
        )),
    }
}

/// POST /api/refresh — run a manual refresh and return its report.
pub async fn post_refresh(State(state): State<AppState>) -> Json<RefreshRun> {
    info!("Manual refresh requested via API");
    let run = state.coordinator.run_refresh(RefreshTrigger::Manual).await;
    Json(run)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
