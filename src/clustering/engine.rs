//! Cluster assignment, reuse and merge reconciliation.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, info};

use super::allocator::AccessionAllocator;
use crate::storage::bulk::{BulkWriter, ClusteringCounts};
use crate::storage::reader::ClusteringStoreReader;
use crate::storage::traits::{ChunkedReader, VariantStore};
use crate::variant::{
    ClusteredOperation, ClusteredVariant, SiteKey, SubmittedOperation, SubmittedVariant,
};
use crate::Result;

/// Survivor selection between two colliding accessions. Kept as a single
/// swappable function so the tie-break rule can change without touching
/// the merge mechanics.
pub type MergePolicy = fn(u64, u64) -> u64;

/// Default policy: the numerically lowest accession survives. Lower
/// values were assigned first and callers may already reference them.
pub fn lowest_accession_wins(a: u64, b: u64) -> u64 {
    a.min(b)
}

/// What one chunk (or one whole run) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Submitted variants consumed
    pub read: usize,
    /// New clustered accessions allocated
    pub created: usize,
    /// Clustered variants deactivated by merges
    pub merged: usize,
    /// Submitted variants given their first clustered accession
    pub attached: usize,
    /// Submitted variants moved from a merged accession to its survivor
    pub repointed: usize,
}

impl ChunkSummary {
    fn absorb(&mut self, other: &ChunkSummary) {
        self.read += other.read;
        self.created += other.created;
        self.merged += other.merged;
        self.attached += other.attached;
        self.repointed += other.repointed;
    }
}

/// Resolution of one site within the current chunk.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Assigned(u64),
    /// Index into the chunk's pending-new sites, resolved once the block
    /// allocation has happened.
    Pending(usize),
}

struct MergePlan {
    survivor: u64,
    loser: ClusteredVariant,
}

/// Establishes the cluster identity of submitted variants, one bounded
/// chunk at a time.
///
/// The engine holds no state across chunks beyond what the store gives
/// back; in-flight collision detection within a chunk uses a working set
/// keyed by site. A chunk is the unit of retry: every write it performs
/// is idempotent, so an aborted chunk can be re-run from the start.
pub struct ClusteringEngine<'a, S: VariantStore + ?Sized> {
    store: &'a S,
    allocator: &'a dyn AccessionAllocator,
    counts: &'a ClusteringCounts,
    policy: MergePolicy,
}

impl<'a, S: VariantStore + ?Sized> ClusteringEngine<'a, S> {
    pub fn new(
        store: &'a S,
        allocator: &'a dyn AccessionAllocator,
        counts: &'a ClusteringCounts,
    ) -> Self {
        Self {
            store,
            allocator,
            counts,
            policy: lowest_accession_wins,
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cluster every submitted variant of `assembly` that does not yet
    /// reference a clustered accession.
    pub fn run(&self, assembly: &str, chunk_size: usize) -> Result<ChunkSummary> {
        self.run_with_progress(assembly, chunk_size, |_| {})
    }

    /// Like [`run`](Self::run), invoking `on_chunk` with the number of
    /// variants consumed after each chunk commits.
    pub fn run_with_progress<F>(
        &self,
        assembly: &str,
        chunk_size: usize,
        on_chunk: F,
    ) -> Result<ChunkSummary>
    where
        F: Fn(usize),
    {
        let chunk_size = chunk_size.max(1);
        let mut reader = ClusteringStoreReader::new(self.store, assembly, chunk_size);
        reader.open()?;

        let mut total = ChunkSummary::default();
        loop {
            let mut chunk = Vec::with_capacity(chunk_size);
            while chunk.len() < chunk_size {
                match reader.read()? {
                    Some(variant) => chunk.push(variant),
                    None => break,
                }
            }
            if chunk.is_empty() {
                break;
            }
            let summary = self.process_chunk(&chunk)?;
            on_chunk(summary.read);
            total.absorb(&summary);
        }
        reader.close();

        info!(
            assembly,
            read = total.read,
            created = total.created,
            merged = total.merged,
            "clustering run finished"
        );
        Ok(total)
    }

    /// Establish the cluster identity of every variant in one chunk.
    ///
    /// For each distinct site: no active cluster means a new accession,
    /// exactly one means reuse, more than one is a collision healed by
    /// merging into the survivor the policy selects. History records are
    /// persisted before documents are updated, so a crash anywhere in the
    /// tail is completed by re-running the chunk.
    pub fn process_chunk(&self, chunk: &[SubmittedVariant]) -> Result<ChunkSummary> {
        let mut summary = ChunkSummary {
            read: chunk.len(),
            ..Default::default()
        };

        // Classification: resolve each distinct site once.
        let mut working: HashMap<SiteKey, Slot> = HashMap::new();
        let mut pending: IndexSet<SiteKey> = IndexSet::new();
        let mut merge_plans: Vec<MergePlan> = Vec::new();
        let mut assignments: Vec<Slot> = Vec::with_capacity(chunk.len());

        for variant in chunk {
            let site = variant.site_key();
            if let Some(slot) = working.get(&site) {
                assignments.push(*slot);
                continue;
            }

            let actives = self.store.active_clustered_at_site(&site)?;
            let slot = match actives.split_first() {
                None => {
                    let (index, _) = pending.insert_full(site.clone());
                    Slot::Pending(index)
                }
                Some((only, [])) => Slot::Assigned(only.accession),
                Some((first, rest)) => {
                    let survivor = rest
                        .iter()
                        .fold(first.accession, |best, candidate| {
                            (self.policy)(best, candidate.accession)
                        });
                    for loser in actives.iter().filter(|c| c.accession != survivor) {
                        debug!(
                            site = %site,
                            loser = loser.accession,
                            survivor,
                            "collision detected, planning merge"
                        );
                        merge_plans.push(MergePlan {
                            survivor,
                            loser: loser.clone(),
                        });
                    }
                    Slot::Assigned(survivor)
                }
            };
            working.insert(site, slot);
            assignments.push(slot);
        }

        // One block for every site that needs a new accession. Allocation
        // failure aborts the chunk before anything has been written.
        let block = self.allocator.allocate(pending.len())?;
        summary.created = block.len();

        let writer = BulkWriter::new(self.store, self.counts);

        // History records go first. Their ids are deterministic, so if the
        // chunk dies between history and the document updates, the retry
        // rewrites them as duplicate-key no-ops and finishes the updates.
        let mut clustered_operations = Vec::with_capacity(merge_plans.len());
        let mut submitted_operations = Vec::new();
        let mut repoints: Vec<(String, u64)> = Vec::new();
        for plan in &merge_plans {
            clustered_operations.push(ClusteredOperation::merged(&plan.loser, plan.survivor));
            let referring = self
                .store
                .submitted_by_clustered_accession(&plan.loser.assembly, plan.loser.accession)?;
            for before in referring {
                submitted_operations.push(SubmittedOperation::clustered_accession_updated(
                    &before,
                    plan.loser.accession,
                    plan.survivor,
                ));
                repoints.push((before.id(), plan.survivor));
            }
        }
        writer.write_clustered_operations(&clustered_operations)?;
        writer.write_submitted_operations(&submitted_operations)?;

        let new_clustered: Vec<ClusteredVariant> = pending
            .iter()
            .zip(block.iter())
            .map(|(site, &accession)| ClusteredVariant::new(accession, site))
            .collect();
        writer.write_clustered(&new_clustered)?;

        // Document updates: deactivate merged-away clusters, re-point the
        // submitted variants that referenced them.
        for plan in &merge_plans {
            if self.store.deactivate_clustered(plan.loser.accession)? {
                summary.merged += 1;
                self.counts.add_clustered_variants_merged(1);
            }
        }
        for (id, accession) in &repoints {
            if self.store.set_clustered_accession(id, *accession)? {
                summary.repointed += 1;
                self.counts.add_submitted_variants_updated(1);
            }
        }

        // Attach the chunk's own variants to their resolved clusters.
        for (variant, slot) in chunk.iter().zip(&assignments) {
            let accession = match slot {
                Slot::Assigned(accession) => *accession,
                Slot::Pending(index) => block[*index],
            };
            match variant.clustered_accession {
                None => {
                    if self.store.set_clustered_accession(&variant.id(), accession)? {
                        summary.attached += 1;
                        self.counts.add_submitted_variants_updated(1);
                    }
                }
                // Already pointing at the resolved cluster, or re-pointed
                // by the merge pass above; the chunk copy is stale.
                Some(_) => {}
            }
        }

        debug!(
            read = summary.read,
            created = summary.created,
            merged = summary.merged,
            attached = summary.attached,
            repointed = summary.repointed,
            "chunk committed"
        );
        Ok(summary)
    }
}
