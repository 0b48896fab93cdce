//! salesdash-ingest library
//!
//! CSV ingestion and aggregation service behind the sales dashboard:
//! row parser → aggregator → ingestion service → in-memory summary store,
//! exposed over HTTP.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod service;
pub mod store;

pub use crate::error::{ApiError, ApiResult, IngestError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::IngestionService;

/// Room left in the request body limit for multipart boundaries and headers
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Upload intake, owns the summary store handle
    pub ingestion: IngestionService,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(ingestion: IngestionService) -> Self {
        Self {
            ingestion,
            startup_time: salesdash_common::time::now(),
        }
    }

    /// Largest request body axum will buffer
    pub fn body_limit(&self) -> usize {
        self.ingestion
            .max_upload_bytes()
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .merge(api::upload_routes())
        .merge(api::summary_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        // The dashboard is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
