//! Sales data models
//!
//! `SalesRecord` lives only for one parse-and-fold pass. `SalesSummary` is the
//! immutable result stored per successful upload and serialized in the
//! camelCase shape the dashboard expects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One parsed CSV data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub product_name: String,
    pub quantity: u64,
    pub unit_price: Decimal,
}

impl SalesRecord {
    /// Line revenue: unit price × quantity
    ///
    /// `None` on decimal overflow, including products that would have to be
    /// rounded to fit.
    pub fn revenue(&self) -> Option<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .filter(|revenue| revenue.scale() == self.unit_price.scale())
    }
}

/// Aggregated totals for one upload, before it has an identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesTotals {
    pub total_records: u64,
    pub total_quantity: u64,
    pub total_revenue: Decimal,
    pub rejected_records: u64,
}

/// Summary waiting to be inserted; the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSummary {
    pub file_name: String,
    pub upload_timestamp: DateTime<Utc>,
    pub totals: SalesTotals,
}

/// Stored summary of one successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub id: String,
    pub upload_timestamp: DateTime<Utc>,
    pub total_records: u64,
    pub total_quantity: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub file_name: String,
    pub rejected_records: u64,
}

impl SalesSummary {
    pub(crate) fn from_pending(id: String, pending: PendingSummary) -> Self {
        Self {
            id,
            upload_timestamp: pending.upload_timestamp,
            total_records: pending.totals.total_records,
            total_quantity: pending.totals.total_quantity,
            total_revenue: pending.totals.total_revenue,
            file_name: pending.file_name,
            rejected_records: pending.totals.rejected_records,
        }
    }
}
