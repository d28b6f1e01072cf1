//! Replays merge history into the canonical current view of every variant
//! that has ever been merged, so downstream consumers never meet a stale
//! accession without its resolution.

use indexmap::IndexMap;
use tracing::debug;

use crate::storage::traits::{ChunkedReader, VariantStore};
use crate::variant::{ClusteredVariantSnapshot, EventType, VariantType};
use crate::{LodestoneError, Result};

/// One reconciled row: the allele-level state a submitted variant had at
/// the time its cluster was merged, keyed to the surviving accession.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MergedVariant {
    /// The effective identifier: the accession the cluster was merged into
    pub accession: u64,
    /// The accession that was deactivated by the merge
    pub merged_from: u64,
    pub contig: String,
    pub start: u64,
    pub variant_type: VariantType,
    pub reference: String,
    pub alternate: String,
    pub study: String,
    /// Validated flag of the merged cluster
    pub validated: bool,
    /// Validated flag of the submitted variant
    pub ss_validated: bool,
    pub alleles_match: bool,
    pub assembly_match: bool,
    pub supported_by_evidence: bool,
}

type FoldKey = (String, u64, String, String, String);

/// Reconstruct the merged-variant view for one assembly.
///
/// Read-only and deterministic: MERGED operations are selected by the
/// assembly recorded in their snapshot, ordered by (contig, start), joined
/// to the UPDATED submitted-variant operations that captured allele state
/// at merge time, and folded by (contig, start, reference, alternate,
/// study). Any record carrying more than one snapshot aborts the
/// reconstruction; that is an upstream logic defect, not a data condition.
pub fn reconstruct_merged<S: VariantStore + ?Sized>(
    store: &S,
    assembly: &str,
) -> Result<Vec<MergedVariant>> {
    let operations = store.merged_operations(assembly)?;
    debug!(
        assembly,
        merged_operations = operations.len(),
        "reconstructing merged variants"
    );

    let mut records: Vec<(ClusteredVariantSnapshot, u64, u64)> = Vec::new();
    for operation in &operations {
        let snapshot = operation.single_inactive()?.clone();
        let merge_into = operation.merge_into.ok_or_else(|| {
            LodestoneError::InvariantViolation(format!(
                "MERGED operation '{}' has no merge target",
                operation.id
            ))
        })?;
        records.push((snapshot, operation.accession, merge_into));
    }
    records.sort_by(|a, b| {
        (a.0.contig.as_str(), a.0.start, a.1).cmp(&(b.0.contig.as_str(), b.0.start, b.1))
    });

    let mut folded: IndexMap<FoldKey, MergedVariant> = IndexMap::new();
    for (snapshot, merged_from, merge_into) in &records {
        let submitted_operations = store.submitted_operations_for_clustered(*merged_from)?;
        for submitted_operation in &submitted_operations {
            // Only UPDATED entries carry the allele-level state this view
            // is built from.
            if submitted_operation.event != EventType::Updated {
                continue;
            }
            let state = submitted_operation.single_inactive()?;

            let key: FoldKey = (
                snapshot.contig.clone(),
                snapshot.start,
                state.reference.clone(),
                state.alternate.clone(),
                state.study.clone(),
            );
            folded.entry(key).or_insert_with(|| MergedVariant {
                accession: *merge_into,
                merged_from: *merged_from,
                contig: snapshot.contig.clone(),
                start: snapshot.start,
                variant_type: snapshot.variant_type,
                reference: state.reference.clone(),
                alternate: state.alternate.clone(),
                study: state.study.clone(),
                validated: snapshot.validated,
                ss_validated: state.validated,
                alleles_match: state.alleles_match,
                assembly_match: state.assembly_match,
                supported_by_evidence: state.supported_by_evidence,
            });
        }
    }

    Ok(folded.into_values().collect())
}

/// Streaming adapter over [`reconstruct_merged`] for export consumers.
pub struct MergedVariantReader<'a, S: VariantStore + ?Sized> {
    store: &'a S,
    assembly: String,
    rows: Option<std::vec::IntoIter<MergedVariant>>,
}

impl<'a, S: VariantStore + ?Sized> MergedVariantReader<'a, S> {
    pub fn new(store: &'a S, assembly: &str) -> Self {
        Self {
            store,
            assembly: assembly.to_string(),
            rows: None,
        }
    }
}

impl<'a, S: VariantStore + ?Sized> ChunkedReader for MergedVariantReader<'a, S> {
    type Item = MergedVariant;

    fn open(&mut self) -> Result<()> {
        self.rows = Some(reconstruct_merged(self.store, &self.assembly)?.into_iter());
        Ok(())
    }

    fn read(&mut self) -> Result<Option<MergedVariant>> {
        match self.rows.as_mut() {
            Some(rows) => Ok(rows.next()),
            None => Err(LodestoneError::Store(
                "reader used before open or after close".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        self.rows = None;
    }
}
