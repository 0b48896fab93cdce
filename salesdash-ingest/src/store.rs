//! In-memory summary store
//!
//! Owns every stored `SalesSummary` for the lifetime of the process. One
//! `RwLock` guards the whole store: inserts serialize, `list`/`get` share the
//! read side and hand back clones, so a returned snapshot never changes.
//! The store assigns ids inside the write critical section.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{PendingSummary, SalesSummary};

/// Store failure; the summary was not inserted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("summary store lock is poisoned")]
    Unavailable,

    #[error("summary store is full ({capacity} summaries)")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Default)]
struct Inner {
    /// Ids in insertion order
    order: Vec<String>,
    summaries: HashMap<String, SalesSummary>,
}

/// Registry of upload summaries keyed by id
#[derive(Debug, Default)]
pub struct SummaryStore {
    inner: RwLock<Inner>,
    capacity: Option<usize>,
}

impl SummaryStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing inserts once `capacity` summaries are held
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            inner: RwLock::default(),
            capacity,
        }
    }

    /// Assign a fresh id and store the summary
    ///
    /// Returns the stored copy, including its id.
    pub fn insert(&self, pending: PendingSummary) -> Result<SalesSummary, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Unavailable)?;

        if let Some(capacity) = self.capacity {
            if inner.order.len() >= capacity {
                return Err(StoreError::CapacityExceeded { capacity });
            }
        }

        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !inner.summaries.contains_key(&candidate) {
                break candidate;
            }
        };

        let summary = SalesSummary::from_pending(id.clone(), pending);
        inner.order.push(id.clone());
        inner.summaries.insert(id, summary.clone());

        debug!(id = %summary.id, stored = inner.order.len(), "Summary stored");
        Ok(summary)
    }

    /// Snapshot of all summaries in insertion order
    pub fn list(&self) -> Result<Vec<SalesSummary>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.summaries.get(id).cloned())
            .collect())
    }

    /// Look up one summary; unknown ids are `Ok(None)`
    pub fn get(&self, id: &str) -> Result<Option<SalesSummary>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
        Ok(inner.summaries.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
        Ok(inner.order.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
