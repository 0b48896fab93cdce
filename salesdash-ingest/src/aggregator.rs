//! Single-pass fold of parsed rows into upload totals
//!
//! Rejected rows are only counted. Accepted rows add to the quantity (u64)
//! and revenue (`Decimal`) sums. The fold is commutative so row order does
//! not matter, and it keeps no per-row state.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{SalesRecord, SalesTotals};
use crate::parser::RowError;

/// Row errors logged individually before the rest are only counted
const LOGGED_ROW_ERRORS: u64 = 10;

/// Totals no longer fit their numeric type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("total quantity overflowed at data row {row}")]
    QuantityOverflow { row: u64 },

    #[error("total revenue overflowed at data row {row}")]
    RevenueOverflow { row: u64 },
}

/// Running totals for one upload
#[derive(Debug, Default)]
pub struct Aggregator {
    totals: SalesTotals,
    rows_seen: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parser item into the totals
    pub fn push(&mut self, row: Result<SalesRecord, RowError>) -> Result<(), AggregateError> {
        self.rows_seen += 1;
        match row {
            Ok(record) => self.accept(&record),
            Err(err) => {
                self.totals.rejected_records += 1;
                if self.totals.rejected_records <= LOGGED_ROW_ERRORS {
                    warn!(error = %err, "Skipping malformed CSV row");
                } else {
                    debug!(error = %err, "Skipping malformed CSV row");
                }
                Ok(())
            }
        }
    }

    fn accept(&mut self, record: &SalesRecord) -> Result<(), AggregateError> {
        let row = self.rows_seen;
        let revenue = record
            .revenue()
            .ok_or(AggregateError::RevenueOverflow { row })?;

        let total_quantity = self
            .totals
            .total_quantity
            .checked_add(record.quantity)
            .ok_or(AggregateError::QuantityOverflow { row })?;
        // A sum that lost decimal places was rounded, not exact
        let scale = self.totals.total_revenue.scale().max(revenue.scale());
        let total_revenue = self
            .totals
            .total_revenue
            .checked_add(revenue)
            .filter(|sum| sum.scale() >= scale)
            .ok_or(AggregateError::RevenueOverflow { row })?;

        self.totals.total_quantity = total_quantity;
        self.totals.total_revenue = total_revenue;
        self.totals.total_records += 1;
        Ok(())
    }

    /// Totals and rejection count accumulated so far
    pub fn finish(self) -> SalesTotals {
        self.totals
    }
}

/// Fold a whole row sequence
pub fn aggregate<I>(rows: I) -> Result<SalesTotals, AggregateError>
where
    I: IntoIterator<Item = Result<SalesRecord, RowError>>,
{
    let mut aggregator = Aggregator::new();
    for row in rows {
        aggregator.push(row)?;
    }
    Ok(aggregator.finish())
}
