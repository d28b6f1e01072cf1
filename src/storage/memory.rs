//! Concurrency-safe in-memory store with JSONL persistence.
//!
//! The reference backing for the clustering engine: one concurrent map per
//! collection, keyed by document id, with duplicate-key detection on
//! insert and an optional directory layout of one JSONL file per
//! collection for loading and flushing state between runs.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::{BulkOutcome, VariantStore};
use crate::variant::{
    ClusteredOperation, ClusteredVariant, EventType, SiteKey, SubmittedOperation, SubmittedVariant,
};
use crate::Result;

const SUBMITTED_FILE: &str = "submitted-variants.jsonl";
const CLUSTERED_FILE: &str = "clustered-variants.jsonl";
const CLUSTERED_OPERATIONS_FILE: &str = "clustered-operations.jsonl";
const SUBMITTED_OPERATIONS_FILE: &str = "submitted-operations.jsonl";

/// Collection totals, for run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub submitted: usize,
    pub clustered: usize,
    pub clustered_operations: usize,
    pub submitted_operations: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    submitted: DashMap<String, SubmittedVariant>,
    clustered: DashMap<u64, ClusteredVariant>,
    clustered_operations: DashMap<String, ClusteredOperation>,
    submitted_operations: DashMap<String, SubmittedOperation>,
    /// Site index over every cluster ever inserted; never pruned, the
    /// active flag on the document decides visibility.
    site_index: DashMap<SiteKey, Vec<u64>>,
}

fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut documents = Vec::new();
    if !path.exists() {
        return Ok(documents);
    }
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }
    Ok(documents)
}

fn write_jsonl<T: Serialize>(path: &Path, documents: &[&T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections from a store directory. Missing files are treated
    /// as empty collections so a fresh directory is a valid empty store.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let store = Self::new();

        let submitted: Vec<SubmittedVariant> = load_jsonl(&dir.join(SUBMITTED_FILE))?;
        store.insert_submitted(&submitted)?;

        let clustered: Vec<ClusteredVariant> = load_jsonl(&dir.join(CLUSTERED_FILE))?;
        store.insert_clustered(&clustered)?;

        let clustered_operations: Vec<ClusteredOperation> =
            load_jsonl(&dir.join(CLUSTERED_OPERATIONS_FILE))?;
        store.insert_clustered_operations(&clustered_operations)?;

        let submitted_operations: Vec<SubmittedOperation> =
            load_jsonl(&dir.join(SUBMITTED_OPERATIONS_FILE))?;
        store.insert_submitted_operations(&submitted_operations)?;

        Ok(store)
    }

    /// Write every collection back out, one JSONL file per collection,
    /// documents in key order so flushes are reproducible.
    pub fn flush<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut submitted: Vec<_> = self.submitted.iter().map(|e| e.value().clone()).collect();
        submitted.sort_by_key(|v| v.id());
        write_jsonl(
            &dir.join(SUBMITTED_FILE),
            &submitted.iter().collect::<Vec<_>>(),
        )?;

        let mut clustered: Vec<_> = self.clustered.iter().map(|e| e.value().clone()).collect();
        clustered.sort_by_key(|v| v.accession);
        write_jsonl(
            &dir.join(CLUSTERED_FILE),
            &clustered.iter().collect::<Vec<_>>(),
        )?;

        let mut clustered_operations: Vec<_> = self
            .clustered_operations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        clustered_operations.sort_by(|a, b| a.id.cmp(&b.id));
        write_jsonl(
            &dir.join(CLUSTERED_OPERATIONS_FILE),
            &clustered_operations.iter().collect::<Vec<_>>(),
        )?;

        let mut submitted_operations: Vec<_> = self
            .submitted_operations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        submitted_operations.sort_by(|a, b| a.id.cmp(&b.id));
        write_jsonl(
            &dir.join(SUBMITTED_OPERATIONS_FILE),
            &submitted_operations.iter().collect::<Vec<_>>(),
        )?;

        Ok(())
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            submitted: self.submitted.len(),
            clustered: self.clustered.len(),
            clustered_operations: self.clustered_operations.len(),
            submitted_operations: self.submitted_operations.len(),
        }
    }

    /// Highest clustered accession present in the store, across active and
    /// inactive documents. Allocators resume above this so values are
    /// never reissued after a restart.
    pub fn max_clustered_accession(&self) -> Option<u64> {
        self.clustered.iter().map(|e| *e.key()).max()
    }
}

impl VariantStore for MemoryStore {
    fn insert_submitted(&self, variants: &[SubmittedVariant]) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for variant in variants {
            match self.submitted.entry(variant.id()) {
                Entry::Occupied(_) => outcome.duplicates += 1,
                Entry::Vacant(entry) => {
                    entry.insert(variant.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn unclustered_submitted_ids(&self, assembly: &str) -> Result<Vec<String>> {
        let mut ids: Vec<(String, u64, u64, String)> = self
            .submitted
            .iter()
            .filter(|e| e.value().assembly == assembly && e.value().clustered_accession.is_none())
            .map(|e| {
                let v = e.value();
                (v.contig.clone(), v.start, v.accession, e.key().clone())
            })
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, _, _, id)| id).collect())
    }

    fn get_submitted(&self, ids: &[String]) -> Result<Vec<SubmittedVariant>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.submitted.get(id).map(|e| e.value().clone()))
            .collect())
    }

    fn submitted_by_clustered_accession(
        &self,
        assembly: &str,
        accession: u64,
    ) -> Result<Vec<SubmittedVariant>> {
        let mut variants: Vec<_> = self
            .submitted
            .iter()
            .filter(|e| {
                e.value().assembly == assembly
                    && e.value().clustered_accession == Some(accession)
            })
            .map(|e| e.value().clone())
            .collect();
        variants.sort_by_key(|v| v.accession);
        Ok(variants)
    }

    fn set_clustered_accession(&self, id: &str, accession: u64) -> Result<bool> {
        match self.submitted.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().clustered_accession = Some(accession);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_clustered(&self, variants: &[ClusteredVariant]) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for variant in variants {
            match self.clustered.entry(variant.accession) {
                Entry::Occupied(_) => outcome.duplicates += 1,
                Entry::Vacant(entry) => {
                    entry.insert(variant.clone());
                    self.site_index
                        .entry(variant.site_key())
                        .or_default()
                        .push(variant.accession);
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn active_clustered_at_site(&self, site: &SiteKey) -> Result<Vec<ClusteredVariant>> {
        let Some(accessions) = self.site_index.get(site) else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<_> = accessions
            .iter()
            .filter_map(|accession| self.clustered.get(accession))
            .filter(|entry| entry.value().active)
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|v| v.accession);
        Ok(matches)
    }

    fn get_clustered(&self, accession: u64) -> Result<Option<ClusteredVariant>> {
        Ok(self.clustered.get(&accession).map(|e| e.value().clone()))
    }

    fn clustered_for_assembly(&self, assembly: &str) -> Result<Vec<ClusteredVariant>> {
        let mut variants: Vec<_> = self
            .clustered
            .iter()
            .filter(|e| e.value().assembly == assembly)
            .map(|e| e.value().clone())
            .collect();
        variants.sort_by_key(|v| v.accession);
        Ok(variants)
    }

    fn deactivate_clustered(&self, accession: u64) -> Result<bool> {
        match self.clustered.get_mut(&accession) {
            Some(mut entry) => {
                entry.value_mut().active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_clustered_operations(&self, operations: &[ClusteredOperation]) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for operation in operations {
            match self.clustered_operations.entry(operation.id.clone()) {
                Entry::Occupied(_) => outcome.duplicates += 1,
                Entry::Vacant(entry) => {
                    entry.insert(operation.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn insert_submitted_operations(&self, operations: &[SubmittedOperation]) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for operation in operations {
            match self.submitted_operations.entry(operation.id.clone()) {
                Entry::Occupied(_) => outcome.duplicates += 1,
                Entry::Vacant(entry) => {
                    entry.insert(operation.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn merged_operations(&self, assembly: &str) -> Result<Vec<ClusteredOperation>> {
        let mut operations: Vec<_> = self
            .clustered_operations
            .iter()
            .filter(|e| {
                e.value().event == EventType::Merged
                    && e.value().inactive.iter().any(|s| s.assembly == assembly)
            })
            .map(|e| e.value().clone())
            .collect();
        operations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(operations)
    }

    fn submitted_operations_for_clustered(&self, accession: u64) -> Result<Vec<SubmittedOperation>> {
        let mut operations: Vec<_> = self
            .submitted_operations
            .iter()
            .filter(|e| {
                e.value()
                    .inactive
                    .iter()
                    .any(|s| s.clustered_accession == Some(accession))
            })
            .map(|e| e.value().clone())
            .collect();
        operations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VariantType;

    fn submitted(accession: u64, contig: &str, start: u64, study: &str) -> SubmittedVariant {
        SubmittedVariant {
            accession,
            assembly: "GCA_000000001.1".to_string(),
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

    fn clustered(accession: u64, contig: &str, start: u64) -> ClusteredVariant {
        ClusteredVariant::new(
            accession,
            &SiteKey {
                assembly: "GCA_000000001.1".to_string(),
                contig: contig.to_string(),
                start,
                variant_type: VariantType::Snv,
            },
        )
    }

    #[test]
    fn test_duplicate_submitted_insert_is_reported() {
        let store = MemoryStore::new();
        let batch = vec![submitted(1, "CM000001.1", 100, "S1")];

        let first = store.insert_submitted(&batch).unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(first.duplicates, 0);

        let replay = store.insert_submitted(&batch).unwrap();
        assert_eq!(replay.inserted, 0);
        assert_eq!(replay.duplicates, 1);
        assert_eq!(store.counts().submitted, 1);
    }

    #[test]
    fn test_active_clustered_at_site_hides_inactive() {
        let store = MemoryStore::new();
        store
            .insert_clustered(&[clustered(100, "CM000001.1", 5000), clustered(200, "CM000001.1", 5000)])
            .unwrap();

        let site = clustered(100, "CM000001.1", 5000).site_key();
        assert_eq!(store.active_clustered_at_site(&site).unwrap().len(), 2);

        assert!(store.deactivate_clustered(200).unwrap());
        let actives = store.active_clustered_at_site(&site).unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].accession, 100);

        // The document itself is retained.
        assert!(store.get_clustered(200).unwrap().is_some());
    }

    #[test]
    fn test_unclustered_ids_are_stable_and_filtered() {
        let store = MemoryStore::new();
        let mut done = submitted(6, "CM000001.1", 600, "S1");
        done.clustered_accession = Some(100);
        store
            .insert_submitted(&[
                submitted(2, "CM000001.1", 200, "S1"),
                submitted(1, "CM000001.1", 100, "S1"),
                done,
            ])
            .unwrap();

        let ids = store.unclustered_submitted_ids("GCA_000000001.1").unwrap();
        assert_eq!(ids.len(), 2);
        let variants = store.get_submitted(&ids).unwrap();
        assert_eq!(variants[0].start, 100);
        assert_eq!(variants[1].start, 200);
    }

    #[test]
    fn test_flush_and_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store
            .insert_submitted(&[submitted(1, "CM000001.1", 100, "S1")])
            .unwrap();
        store.insert_clustered(&[clustered(100, "CM000001.1", 100)]).unwrap();
        store
            .insert_clustered_operations(&[ClusteredOperation::merged(
                &clustered(200, "CM000001.1", 100),
                100,
            )])
            .unwrap();
        store.flush(dir.path()).unwrap();

        let reloaded = MemoryStore::open(dir.path()).unwrap();
        assert_eq!(reloaded.counts(), store.counts());
        assert_eq!(reloaded.max_clustered_accession(), Some(100));

        let site = clustered(100, "CM000001.1", 100).site_key();
        assert_eq!(reloaded.active_clustered_at_site(&site).unwrap().len(), 1);
    }

    #[test]
    fn test_merged_operations_scoped_by_assembly() {
        let store = MemoryStore::new();
        store
            .insert_clustered_operations(&[ClusteredOperation::merged(
                &clustered(200, "CM000001.1", 100),
                100,
            )])
            .unwrap();

        assert_eq!(store.merged_operations("GCA_000000001.1").unwrap().len(), 1);
        assert!(store.merged_operations("GCA_000000002.1").unwrap().is_empty());
    }
}
