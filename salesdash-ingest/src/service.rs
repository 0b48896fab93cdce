//! Ingestion service
//!
//! Drives one upload end to end: format and size checks, parse + aggregate on
//! a blocking worker, then a single insert into the store. Any failure before
//! the insert leaves the store untouched.

use std::sync::Arc;

use axum::body::Bytes;
use tracing::{info, warn};

use crate::aggregator::aggregate;
use crate::error::IngestError;
use crate::models::{PendingSummary, SalesSummary, SalesTotals};
use crate::parser::{CsvSchema, RowParser};
use crate::store::SummaryStore;

/// Content types browsers and tools commonly send for CSV files
const CSV_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "text/plain",
    "application/vnd.ms-excel",
    "application/octet-stream",
];

/// Upload intake; cheap to clone, shares the store
#[derive(Debug, Clone)]
pub struct IngestionService {
    store: Arc<SummaryStore>,
    schema: Arc<CsvSchema>,
    max_upload_bytes: usize,
}

impl IngestionService {
    pub fn new(store: Arc<SummaryStore>, schema: CsvSchema, max_upload_bytes: usize) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
            max_upload_bytes,
        }
    }

    pub fn store(&self) -> &Arc<SummaryStore> {
        &self.store
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Ingest one uploaded file
    ///
    /// On success the returned summary is already visible through the store.
    pub async fn ingest(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<SalesSummary, IngestError> {
        let result = self.run(file_name, content_type, bytes).await;
        if let Err(e) = &result {
            warn!(file_name = %file_name, error = %e, "Ingestion failed");
        }
        result
    }

    async fn run(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<SalesSummary, IngestError> {
        validate_format(file_name, content_type)?;

        if bytes.len() > self.max_upload_bytes {
            return Err(IngestError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }

        // Dropping this future (client went away) discards the result unstored
        let schema = Arc::clone(&self.schema);
        let totals = tokio::task::spawn_blocking(move || summarize(&bytes, &schema))
            .await
            .map_err(|e| IngestError::Worker(e.to_string()))??;

        let summary = self.store.insert(PendingSummary {
            file_name: file_name.to_string(),
            upload_timestamp: salesdash_common::time::now(),
            totals,
        })?;

        info!(
            id = %summary.id,
            file_name = %summary.file_name,
            records = summary.total_records,
            rejected = summary.rejected_records,
            quantity = summary.total_quantity,
            revenue = %summary.total_revenue,
            "Sales data ingested"
        );
        Ok(summary)
    }
}

/// Check the extension is `.csv` and any declared content type is CSV-compatible
pub fn validate_format(file_name: &str, content_type: Option<&str>) -> Result<(), IngestError> {
    // Suffix match so a bare ".csv" name is accepted too
    let is_csv = file_name.to_ascii_lowercase().ends_with(".csv");
    if !is_csv {
        return Err(IngestError::UnsupportedFormat(format!(
            "only .csv files are allowed, got '{}'",
            file_name
        )));
    }

    if let Some(content_type) = content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !essence.is_empty() && !CSV_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(IngestError::UnsupportedFormat(format!(
                "content type '{}' is not CSV",
                essence
            )));
        }
    }

    Ok(())
}

/// Parse and fold one upload
///
/// Succeeds with zero totals for an empty or header-only file. Fails when
/// every data row was rejected.
pub fn summarize(bytes: &[u8], schema: &CsvSchema) -> Result<SalesTotals, IngestError> {
    let parser = RowParser::from_slice(bytes, schema)?;
    let totals = aggregate(parser)?;

    if totals.total_records == 0 && totals.rejected_records > 0 {
        return Err(IngestError::NoValidRows {
            rejected: totals.rejected_records,
        });
    }
    Ok(totals)
}
