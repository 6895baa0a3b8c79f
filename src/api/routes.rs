use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::error::AppError;
use crate::query::{FilterParams, QueryResult, RaceQuery};
use crate::render::{render_dates, render_error, render_race, render_races, RenderTarget, Rendered};
use crate::state::SnapshotStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SnapshotStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/grades", get(get_grades))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Every parameter is optional and kept as text; bad literals degrade the
/// query rather than rejecting the request.
#[derive(Debug, Default)]
pub struct GradesQuery {
    pub date: Option<String>,
    /// Presence-only: list available dates instead of races.
    pub dates: Option<String>,
    pub chamber: Option<String>,
    pub state: Option<String>,
    pub grade: Option<String>,
    pub rating: Option<String>,
    pub min_liquidity: Option<String>,
    pub race: Option<String>,
    pub format: Option<String>,
}

impl GradesQuery {
    /// Build from raw query pairs. A repeated key keeps its first value and
    /// unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "date" => &mut query.date,
                "dates" => &mut query.dates,
                "chamber" => &mut query.chamber,
                "state" => &mut query.state,
                "grade" => &mut query.grade,
                "rating" => &mut query.rating,
                "min_liquidity" | "minLiquidity" => &mut query.min_liquidity,
                "race" => &mut query.race,
                "format" => &mut query.format,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    fn filters(&self) -> FilterParams {
        FilterParams {
            chamber: self.chamber.clone(),
            state: self.state.clone(),
            grade: self.grade.clone(),
            rating: self.rating.clone(),
            min_liquidity: self.min_liquidity.clone(),
            race: self.race.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub latest_date: Option<String>,
    pub available_dates: usize,
    pub requests_served: u64,
    pub not_found: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_grades(
    State(state): State<ApiState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Rendered {
    let started = Instant::now();
    let rendered = grades_response(&state.store, &GradesQuery::from_pairs(pairs));
    state.latency.record(started.elapsed());
    state.health.record_response(rendered.status);
    rendered
}

/// Resolve one grades request against the store: snapshot → filter → render.
pub fn grades_response(store: &SnapshotStore, params: &GradesQuery) -> Rendered {
    let target = RenderTarget::from_format(params.format.as_deref());

    if params.dates.is_some() {
        return match store.list_available_dates() {
            Ok(dates) => render_dates(target, &dates),
            Err(e) => render_failure(target, e),
        };
    }

    let snapshot = match store.load(params.date.as_deref()) {
        Ok(s) => s,
        Err(e) => return render_failure(target, e),
    };

    let query = RaceQuery::from_params(&params.filters());
    match query.run(&snapshot.races) {
        Ok(QueryResult::Races(races)) => render_races(target, &snapshot, &races),
        Ok(QueryResult::Race(race)) => render_race(target, &snapshot, race),
        Err(e) => render_failure(target, e),
    }
}

fn render_failure(target: RenderTarget, err: AppError) -> Rendered {
    if err.status() == StatusCode::NOT_FOUND {
        info!(kind = err.kind(), "{err}");
    } else {
        warn!(kind = err.kind(), "grades request failed: {err}");
    }
    render_error(target, &err)
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let dates = state.store.list_available_dates()?;
    let latest_date = state.store.load(None).ok().map(|s| s.date_string());
    Ok(Json(HealthResponse {
        status: if latest_date.is_some() { "ok" } else { "no_data" },
        latest_date,
        available_dates: dates.len(),
        requests_served: state.health.requests_served(),
        not_found: state.health.not_found(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
