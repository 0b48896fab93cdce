//! Summary listing and detail handlers
//!
//! GET /sales-summaries, GET /sales-summaries/:id, GET /api/sales-summaries/:id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{models::SalesSummary, ApiError, ApiResult, AppState};

/// GET /sales-summaries
///
/// All stored summaries in insertion order.
pub async fn list_summaries(State(state): State<AppState>) -> ApiResult<Json<Vec<SalesSummary>>> {
    let summaries = state.ingestion.store().list()?;
    tracing::debug!(count = summaries.len(), "Listing summaries");
    Ok(Json(summaries))
}

/// GET /sales-summaries/:id
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SalesSummary>> {
    state
        .ingestion
        .store()
        .get(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Sales summary not found: {}", id)))
}

/// Build summary query routes
///
/// The `/api/` detail path is kept for clients of the earlier backend.
pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/sales-summaries", get(list_summaries))
        .route("/sales-summaries/:id", get(get_summary))
        .route("/api/sales-summaries/:id", get(get_summary))
}
