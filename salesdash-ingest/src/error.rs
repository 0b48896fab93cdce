//! Error types for salesdash-ingest
//!
//! `IngestError` covers file-level failures of one upload. `ApiError` is the
//! HTTP boundary type; it renders a plain-text body the dashboard shows
//! verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::aggregator::AggregateError;
use crate::parser::SchemaError;
use crate::store::StoreError;

/// Failure of a whole ingestion; nothing was stored
#[derive(Debug, Error)]
pub enum IngestError {
    /// Wrong extension or content type
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured limit
    #[error("File too large: uploads are limited to {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Header does not match the expected columns
    #[error("Invalid CSV header: {0}")]
    Schema(#[from] SchemaError),

    /// Data rows were present but none could be parsed
    #[error("No valid sales rows found ({rejected} row(s) rejected)")]
    NoValidRows { rejected: u64 },

    /// Totals do not fit their numeric types
    #[error("Totals out of range: {0}")]
    TotalsOverflow(#[from] AggregateError),

    /// Summary could not be stored
    #[error("Summary store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Background parse task failed to complete
    #[error("Ingestion worker failed: {0}")]
    Worker(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Ingestion failure, status depends on the cause
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Store read failure (500)
    #[error("Summary store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ingest(err) => match err {
                IngestError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                IngestError::Schema(_)
                | IngestError::NoValidRows { .. }
                | IngestError::TotalsOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IngestError::StoreUnavailable(_) | IngestError::Worker(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
