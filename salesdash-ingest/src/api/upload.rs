//! CSV upload handler
//!
//! POST /upload-sales-data with a multipart form field named `file`.
//! Failures answer with a plain-text reason and a non-2xx status.

use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::{models::SalesSummary, ApiError, ApiResult, AppState, IngestError};

/// Multipart field carrying the CSV file
pub const FILE_FIELD: &str = "file";

/// POST /upload-sales-data
///
/// Ingests the uploaded CSV and returns the stored summary.
pub async fn upload_sales_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SalesSummary>> {
    let limit = state.ingestion.max_upload_bytes();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!(field = ?field.name(), "Ignoring extra multipart field");
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no file name".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        tracing::debug!(
            file_name = %file_name,
            content_type = ?content_type,
            size = bytes.len(),
            "Received upload"
        );

        let summary = state
            .ingestion
            .ingest(&file_name, content_type.as_deref(), bytes)
            .await?;
        return Ok(Json(summary));
    }

    Err(ApiError::BadRequest(format!(
        "Multipart field '{}' is missing",
        FILE_FIELD
    )))
}

/// Body-limit rejections become `PayloadTooLarge`, anything else is a bad request
fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Ingest(IngestError::PayloadTooLarge { limit })
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload-sales-data", post(upload_sales_data))
}
