//! Contracts between the clustering engine and the backing document store.
//!
//! The raw store driver is a collaborator, not part of this crate; these
//! traits capture exactly the surface the engine and the reconstructor
//! rely on: unordered bulk inserts with per-item outcomes, point queries
//! by site, per-document updates, and the history queries that feed the
//! merged-variant reconstruction.

use crate::variant::{
    ClusteredOperation, ClusteredVariant, SiteKey, SubmittedOperation, SubmittedVariant,
};
use crate::Result;

/// Outcome of one unordered bulk insert. Individual documents succeed or
/// fail independently; duplicate keys are reported separately from real
/// failures because replaying a chunk is expected to hit them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub failures: Vec<String>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Document store surface for variant collections and their operation
/// history. Operation collections are append-only: there is deliberately
/// no update or delete for them.
pub trait VariantStore: Send + Sync {
    // Submitted variants

    fn insert_submitted(&self, variants: &[SubmittedVariant]) -> Result<BulkOutcome>;

    /// Ids of submitted variants in `assembly` that do not yet reference a
    /// clustered accession, in a stable order. This is the snapshot a
    /// clustering reader iterates, so completed work is never reprocessed.
    fn unclustered_submitted_ids(&self, assembly: &str) -> Result<Vec<String>>;

    fn get_submitted(&self, ids: &[String]) -> Result<Vec<SubmittedVariant>>;

    /// All submitted variants in `assembly` referencing `accession`.
    fn submitted_by_clustered_accession(
        &self,
        assembly: &str,
        accession: u64,
    ) -> Result<Vec<SubmittedVariant>>;

    /// Point the submitted variant `id` at `accession`. Returns false if
    /// no such document exists.
    fn set_clustered_accession(&self, id: &str, accession: u64) -> Result<bool>;

    // Clustered variants

    fn insert_clustered(&self, variants: &[ClusteredVariant]) -> Result<BulkOutcome>;

    /// Active clusters at a site. More than one result is a collision the
    /// caller must heal by merging.
    fn active_clustered_at_site(&self, site: &SiteKey) -> Result<Vec<ClusteredVariant>>;

    fn get_clustered(&self, accession: u64) -> Result<Option<ClusteredVariant>>;

    fn clustered_for_assembly(&self, assembly: &str) -> Result<Vec<ClusteredVariant>>;

    /// Mark a cluster inactive. Returns false if no such document exists.
    fn deactivate_clustered(&self, accession: u64) -> Result<bool>;

    // Operation history (append-only)

    fn insert_clustered_operations(&self, operations: &[ClusteredOperation]) -> Result<BulkOutcome>;

    fn insert_submitted_operations(&self, operations: &[SubmittedOperation]) -> Result<BulkOutcome>;

    /// MERGED clustered-variant operations whose inactive snapshot belongs
    /// to `assembly`.
    fn merged_operations(&self, assembly: &str) -> Result<Vec<ClusteredOperation>>;

    /// Submitted-variant operations whose inactive snapshot referenced
    /// `accession` before the change, regardless of event type.
    fn submitted_operations_for_clustered(&self, accession: u64) -> Result<Vec<SubmittedOperation>>;
}

/// Bounded-memory, restartable iteration over a backing query.
///
/// `open` establishes the underlying cursor, repeated `read` calls advance
/// it one entity at a time (materializing one bounded batch at a time
/// internally), and `close` releases it. A closed reader is not
/// restartable without reopening; checkpointing is the orchestration
/// layer's concern.
pub trait ChunkedReader {
    type Item;

    fn open(&mut self) -> Result<()>;

    fn read(&mut self) -> Result<Option<Self::Item>>;

    fn close(&mut self);
}
