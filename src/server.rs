use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::aggregator::{Aggregated, Aggregator};
use crate::models::{FixtureId, LeagueId};
use crate::normalize::canonicalize;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// Build the Axum router for the JSON API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/connection", get(connection_handler))
        .route("/api/fixtures/today", get(today_handler))
        .route("/api/fixtures/live", get(live_handler))
        .route("/api/fixtures/:id", get(fixture_handler))
        .route("/api/roi", get(roi_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.health())
}

/// GET /api/stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.stats())
}

/// GET /api/connection
async fn connection_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.test_connection().await)
}

/// GET /api/fixtures/today
async fn today_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.today_fixtures().await)
}

/// GET /api/fixtures/live
async fn live_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.live_fixtures().await)
}

/// GET /api/fixtures/:id
///
/// The id is looked up verbatim at every provider, so it should belong to the
/// primary's id space.
async fn fixture_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FixtureId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let details = state.aggregator.fixture_details(id).await;
    if !details.is_answered() {
        return Err((StatusCode::NOT_FOUND, format!("fixture {} not found", id)));
    }
    Ok(Json(details.map(|record| canonicalize(&record))))
}

#[derive(Debug, Deserialize)]
struct RoiQuery {
    start: NaiveDate,
    end: NaiveDate,
    league: Option<LeagueId>,
}

/// GET /api/roi?start=2024-08-16&end=2024-08-18&league=39
async fn roi_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RoiQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if q.end < q.start {
        return Err((StatusCode::BAD_REQUEST, "end must not be before start".to_string()));
    }
    if !state.aggregator.range_allowed(q.start, q.end) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("range exceeds {} days", state.aggregator.max_range_days()),
        ));
    }
    let dataset: Aggregated<_> = state.aggregator.roi_data(q.start, q.end, q.league).await;
    Ok(Json(dataset))
}
