//! Axum route handlers for the Recommendation API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::recommend::scorer::{JobQuery, Recommendation, ScoredMatch};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub query: JobQuery,
    /// Falls back to `DEFAULT_TOP_N` when absent.
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
pub struct ScoredResponse {
    pub matches: Vec<ScoredMatch>,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/recommendations
///
/// Top matching postings as (company, link) pairs, best first.
/// Malformed bodies are rejected as `VALIDATION_ERROR`.
pub async fn handle_recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, AppError> {
    let Json(request) = payload?;
    let top_n = request.top_n.unwrap_or(state.config.default_top_n);
    let recommendations = state.recommender.recommend(&request.query, top_n)?;

    info!(
        "Recommended {} postings for '{}' (top_n={top_n})",
        recommendations.len(),
        request.query.title
    );

    Ok(Json(RecommendResponse { recommendations }))
}

/// POST /api/v1/recommendations/scored
///
/// Same ranking with catalog index and similarity per match.
pub async fn handle_recommend_scored(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<ScoredResponse>, AppError> {
    let Json(request) = payload?;
    let top_n = request.top_n.unwrap_or(state.config.default_top_n);
    let matches = state.recommender.rank(&request.query, top_n)?;
    Ok(Json(ScoredResponse { matches }))
}

/// GET /api/v1/recommendations/locations
pub async fn handle_locations(State(state): State<AppState>) -> Json<LocationsResponse> {
    Json(LocationsResponse {
        locations: state.recommender.locations().to_vec(),
    })
}
