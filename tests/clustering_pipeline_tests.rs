//! End-to-end tests of the clustering and merge-reconciliation pipeline:
//! seed a store, cluster it chunk by chunk, and check the invariants the
//! engine promises — uniqueness after reconciliation, accession
//! permanence, idempotent replay, and the merged-variant round trip.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use lodestone::clustering::{ClusteringEngine, MonotonicBlockAllocator};
use lodestone::release::merged::reconstruct_merged;
use lodestone::storage::{ClusteringCounts, MemoryStore, VariantStore};
use lodestone::variant::{ClusteredVariant, SiteKey, SubmittedVariant, VariantType};

const ASSEMBLY: &str = "GCA_000000001.1";
const CHUNK_SIZE: usize = 3;

fn submitted(accession: u64, contig: &str, start: u64, study: &str) -> SubmittedVariant {
    SubmittedVariant {
        accession,
        assembly: ASSEMBLY.to_string(),
        contig: contig.to_string(),
        start,
        variant_type: VariantType::Snv,
        reference: "A".to_string(),
        alternate: "T".to_string(),
        study: study.to_string(),
        validated: false,
        alleles_match: true,
        assembly_match: true,
        supported_by_evidence: false,
        clustered_accession: None,
    }
}

fn site(contig: &str, start: u64) -> SiteKey {
    SiteKey {
        assembly: ASSEMBLY.to_string(),
        contig: contig.to_string(),
        start,
        variant_type: VariantType::Snv,
    }
}

/// Every site with any active cluster must have exactly one.
fn assert_unique_active_clusters(store: &MemoryStore) {
    let mut active_per_site: HashMap<SiteKey, Vec<u64>> = HashMap::new();
    for clustered in store.clustered_for_assembly(ASSEMBLY).unwrap() {
        if clustered.active {
            active_per_site
                .entry(clustered.site_key())
                .or_default()
                .push(clustered.accession);
        }
    }
    for (site, accessions) in active_per_site {
        assert_eq!(
            accessions.len(),
            1,
            "site {} has {} active clusters: {:?}",
            site,
            accessions.len(),
            accessions
        );
    }
}

#[test]
fn clustering_assigns_one_accession_per_site() {
    let store = MemoryStore::new();
    let counts = ClusteringCounts::new();
    let allocator = MonotonicBlockAllocator::new(3_000_000_000);

    // Ten submissions over four sites, from three studies.
    let mut batch = Vec::new();
    let mut ss = 5_000_000_000u64;
    for (contig, start) in [
        ("CM000001.1", 100),
        ("CM000001.1", 100),
        ("CM000001.1", 250),
        ("CM000001.1", 250),
        ("CM000001.1", 250),
        ("CM000002.1", 100),
        ("CM000002.1", 100),
        ("CM000002.1", 400),
        ("CM000002.1", 400),
        ("CM000002.1", 400),
    ] {
        ss += 1;
        batch.push(submitted(ss, contig, start, &format!("S{}", ss % 3)));
    }
    store.insert_submitted(&batch).unwrap();

    let engine = ClusteringEngine::new(&store, &allocator, &counts);
    let summary = engine.run(ASSEMBLY, CHUNK_SIZE).unwrap();

    assert_eq!(summary.read, 10);
    assert_eq!(summary.created, 4);
    assert_eq!(summary.merged, 0);
    assert_unique_active_clusters(&store);

    // Nothing left to cluster.
    assert!(store.unclustered_submitted_ids(ASSEMBLY).unwrap().is_empty());
}

#[test]
fn reconciliation_heals_duplicate_clusters_and_round_trips() {
    let store = MemoryStore::new();
    let counts = ClusteringCounts::new();
    let allocator = MonotonicBlockAllocator::new(3_000_000_000);

    // Two workers raced: accessions 100 and 200 both describe the same
    // site, and one submission already references each of them.
    store
        .insert_clustered(&[
            ClusteredVariant::new(100, &site("CM000001.1", 3000)),
            ClusteredVariant::new(200, &site("CM000001.1", 3000)),
        ])
        .unwrap();
    let mut kept = submitted(5_000_000_001, "CM000001.1", 3000, "S0");
    kept.clustered_accession = Some(100);
    let mut moved = submitted(5_000_000_002, "CM000001.1", 3000, "S1");
    moved.clustered_accession = Some(200);
    let trigger = submitted(5_000_000_003, "CM000001.1", 3000, "S2");
    store
        .insert_submitted(&[kept.clone(), moved.clone(), trigger.clone()])
        .unwrap();

    let engine = ClusteringEngine::new(&store, &allocator, &counts);
    let summary = engine.run(ASSEMBLY, CHUNK_SIZE).unwrap();

    assert_eq!(summary.created, 0);
    assert_eq!(summary.merged, 1);
    assert_unique_active_clusters(&store);

    // 100 survives; 200 stays in the store, deactivated, and in history.
    let actives = store
        .active_clustered_at_site(&site("CM000001.1", 3000))
        .unwrap();
    assert_eq!(actives.len(), 1);
    assert_eq!(actives[0].accession, 100);
    assert!(!store.get_clustered(200).unwrap().unwrap().active);

    let merged_ops = store.merged_operations(ASSEMBLY).unwrap();
    assert_eq!(merged_ops.len(), 1);
    assert_eq!(merged_ops[0].accession, 200);
    assert_eq!(merged_ops[0].merge_into, Some(100));

    // Every submission now references the survivor.
    for variant in store
        .get_submitted(&[kept.id(), moved.id(), trigger.id()])
        .unwrap()
    {
        assert_eq!(variant.clustered_accession, Some(100));
    }

    // The reconstructed view resolves the stale accession.
    let rows = reconstruct_merged(&store, ASSEMBLY).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accession, 100);
    assert_eq!(rows[0].merged_from, 200);
    assert_eq!(rows[0].reference, "A");
    assert_eq!(rows[0].alternate, "T");
    assert_eq!(rows[0].study, "S1");
    assert_eq!(rows[0].start, 3000);
}

#[test]
fn replaying_a_run_allocates_nothing_new() {
    let store = MemoryStore::new();
    let counts = ClusteringCounts::new();
    let allocator = MonotonicBlockAllocator::new(3_000_000_000);
    let batch: Vec<_> = (1..=8)
        .map(|i| submitted(5_000_000_000 + i, "CM000001.1", i * 50, "S1"))
        .collect();
    store.insert_submitted(&batch).unwrap();

    let engine = ClusteringEngine::new(&store, &allocator, &counts);
    let first = engine.run(ASSEMBLY, CHUNK_SIZE).unwrap();
    let active_after_first: Vec<u64> = store
        .clustered_for_assembly(ASSEMBLY)
        .unwrap()
        .iter()
        .filter(|c| c.active)
        .map(|c| c.accession)
        .collect();

    let second = engine.run(ASSEMBLY, CHUNK_SIZE).unwrap();
    let active_after_second: Vec<u64> = store
        .clustered_for_assembly(ASSEMBLY)
        .unwrap()
        .iter()
        .filter(|c| c.active)
        .map(|c| c.accession)
        .collect();

    assert_eq!(first.created, 8);
    assert_eq!(second.read, 0);
    assert_eq!(second.created, 0);
    assert_eq!(active_after_first, active_after_second);
}

#[test]
fn accessions_survive_a_store_restart() {
    let dir = tempfile::tempdir().unwrap();
    let first_accession = 3_000_000_000u64;

    {
        let store = MemoryStore::new();
        let counts = ClusteringCounts::new();
        let allocator = MonotonicBlockAllocator::new(first_accession);
        store
            .insert_submitted(&[submitted(5_000_000_001, "CM000001.1", 100, "S1")])
            .unwrap();
        ClusteringEngine::new(&store, &allocator, &counts)
            .run(ASSEMBLY, CHUNK_SIZE)
            .unwrap();
        store.flush(dir.path()).unwrap();
    }

    // A later run must resume allocation above everything persisted.
    let store = MemoryStore::open(dir.path()).unwrap();
    let resume_from = store.max_clustered_accession().unwrap() + 1;
    assert_eq!(resume_from, first_accession + 1);

    let counts = ClusteringCounts::new();
    let allocator = MonotonicBlockAllocator::new(resume_from);
    store
        .insert_submitted(&[submitted(5_000_000_002, "CM000001.1", 900, "S1")])
        .unwrap();
    ClusteringEngine::new(&store, &allocator, &counts)
        .run(ASSEMBLY, CHUNK_SIZE)
        .unwrap();

    let accessions: Vec<u64> = store
        .clustered_for_assembly(ASSEMBLY)
        .unwrap()
        .iter()
        .map(|c| c.accession)
        .collect();
    assert_eq!(accessions, vec![first_accession, first_accession + 1]);
}

#[test]
fn chunk_replay_after_partial_commit_converges() {
    // Simulate a crash between the history write and the document
    // updates: the history record exists, both clusters are still active.
    // Re-running the chunk must finish the merge without duplicating it.
    let store = MemoryStore::new();
    let counts = ClusteringCounts::new();
    let allocator = MonotonicBlockAllocator::new(3_000_000_000);

    let loser = ClusteredVariant::new(200, &site("CM000001.1", 3000));
    store
        .insert_clustered(&[
            ClusteredVariant::new(100, &site("CM000001.1", 3000)),
            loser.clone(),
        ])
        .unwrap();
    store
        .insert_clustered_operations(&[
            lodestone::variant::ClusteredOperation::merged(&loser, 100),
        ])
        .unwrap();
    let trigger = submitted(5_000_000_001, "CM000001.1", 3000, "S1");
    store.insert_submitted(std::slice::from_ref(&trigger)).unwrap();

    let engine = ClusteringEngine::new(&store, &allocator, &counts);
    engine.run(ASSEMBLY, CHUNK_SIZE).unwrap();

    assert_unique_active_clusters(&store);
    let merged_ops = store.merged_operations(ASSEMBLY).unwrap();
    assert_eq!(merged_ops.len(), 1, "replay must not duplicate history");
    assert!(!store.get_clustered(200).unwrap().unwrap().active);
}
