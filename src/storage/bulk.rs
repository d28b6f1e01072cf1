//! Bulk persistence with partial-failure accounting.
//!
//! Batches are written unordered: no document's success depends on
//! another's. When some documents fail, the count of documents that did
//! succeed is recorded before the failure is re-raised, so progress
//! accounting stays accurate under retry. Duplicate-key outcomes are the
//! expected signature of replaying a chunk after a crash and are skipped,
//! never surfaced as failures.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::traits::{BulkOutcome, VariantStore};
use crate::variant::{ClusteredOperation, ClusteredVariant, SubmittedOperation, SubmittedVariant};
use crate::{LodestoneError, Result};

/// Shared progress counters for a clustering run. Written by the bulk
/// writer and the engine, read by run summaries; all counters are
/// monotonic within a run.
#[derive(Debug, Default)]
pub struct ClusteringCounts {
    clustered_variants_created: AtomicU64,
    submitted_variants_written: AtomicU64,
    submitted_variants_updated: AtomicU64,
    clustered_variants_merged: AtomicU64,
    operations_written: AtomicU64,
}

impl ClusteringCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clustered_variants_created(&self, count: u64) {
        self.clustered_variants_created
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_submitted_variants_written(&self, count: u64) {
        self.submitted_variants_written
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn submitted_variants_written(&self) -> u64 {
        self.submitted_variants_written.load(Ordering::Relaxed)
    }

    pub fn add_submitted_variants_updated(&self, count: u64) {
        self.submitted_variants_updated
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_clustered_variants_merged(&self, count: u64) {
        self.clustered_variants_merged
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_operations_written(&self, count: u64) {
        self.operations_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn clustered_variants_created(&self) -> u64 {
        self.clustered_variants_created.load(Ordering::Relaxed)
    }

    pub fn submitted_variants_updated(&self) -> u64 {
        self.submitted_variants_updated.load(Ordering::Relaxed)
    }

    pub fn clustered_variants_merged(&self) -> u64 {
        self.clustered_variants_merged.load(Ordering::Relaxed)
    }

    pub fn operations_written(&self) -> u64 {
        self.operations_written.load(Ordering::Relaxed)
    }
}

impl std::fmt::Display for ClusteringCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} clusters created, {} merged away, {} submitted variants updated, {} operations written",
            self.clustered_variants_created(),
            self.clustered_variants_merged(),
            self.submitted_variants_updated(),
            self.operations_written()
        )
    }
}

/// Writes one chunk's worth of documents through the store, recording
/// successes before re-raising any partial failure.
pub struct BulkWriter<'a, S: VariantStore + ?Sized> {
    store: &'a S,
    counts: &'a ClusteringCounts,
}

impl<'a, S: VariantStore + ?Sized> BulkWriter<'a, S> {
    pub fn new(store: &'a S, counts: &'a ClusteringCounts) -> Self {
        Self { store, counts }
    }

    fn check(collection: &str, outcome: BulkOutcome) -> Result<BulkOutcome> {
        if outcome.duplicates > 0 {
            debug!(
                collection,
                duplicates = outcome.duplicates,
                "skipped documents that already exist"
            );
        }
        if outcome.is_complete() {
            Ok(outcome)
        } else {
            Err(LodestoneError::BulkWrite {
                written: outcome.inserted as u64,
                message: outcome.failures.join("; "),
            })
        }
    }

    pub fn write_submitted(&self, batch: &[SubmittedVariant]) -> Result<BulkOutcome> {
        let outcome = self.store.insert_submitted(batch)?;
        self.counts
            .add_submitted_variants_written(outcome.inserted as u64);
        Self::check("submitted-variants", outcome)
    }

    pub fn write_clustered(&self, batch: &[ClusteredVariant]) -> Result<BulkOutcome> {
        let outcome = self.store.insert_clustered(batch)?;
        self.counts
            .add_clustered_variants_created(outcome.inserted as u64);
        Self::check("clustered-variants", outcome)
    }

    pub fn write_clustered_operations(&self, batch: &[ClusteredOperation]) -> Result<BulkOutcome> {
        let outcome = self.store.insert_clustered_operations(batch)?;
        self.counts.add_operations_written(outcome.inserted as u64);
        Self::check("clustered-operations", outcome)
    }

    pub fn write_submitted_operations(&self, batch: &[SubmittedOperation]) -> Result<BulkOutcome> {
        let outcome = self.store.insert_submitted_operations(batch)?;
        self.counts.add_operations_written(outcome.inserted as u64);
        Self::check("submitted-operations", outcome)
    }
}
