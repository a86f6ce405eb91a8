//! Shared ingest counters for the /health endpoint.
//! Updated by the ingest handler, read by API.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::types::IngestOutcome;

#[derive(Default)]
pub struct HealthState {
    pub batches_ingested: AtomicU64,
    pub rows_ingested: AtomicU64,
    /// Rows dropped by the quantity/price filter.
    pub rows_dropped: AtomicU64,
    /// Batch timestamp of the last successful ingest (0 = none since startup).
    pub last_ingest_ts: AtomicI64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, outcome: &IngestOutcome) {
        self.batches_ingested.fetch_add(1, Ordering::Relaxed);
        self.rows_ingested.fetch_add(outcome.inserted as u64, Ordering::Relaxed);
        self.rows_dropped.fetch_add(outcome.dropped as u64, Ordering::Relaxed);
        self.last_ingest_ts.fetch_max(outcome.batch_ts, Ordering::Relaxed);
    }

    pub fn batches_ingested(&self) -> u64 {
        self.batches_ingested.load(Ordering::Relaxed)
    }

    pub fn rows_ingested(&self) -> u64 {
        self.rows_ingested.load(Ordering::Relaxed)
    }

    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped.load(Ordering::Relaxed)
    }

    pub fn last_ingest_ts(&self) -> i64 {
        self.last_ingest_ts.load(Ordering::Relaxed)
    }
}
