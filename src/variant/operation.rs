//! Append-only history of identity-affecting changes.
//!
//! Operation records are the only source of truth for reconstructing past
//! state; they are never mutated or deleted after creation. Their ids are
//! deterministic functions of the change they describe, so replaying a
//! chunk regenerates the same ids and the store's duplicate-key handling
//! turns the rewrite into a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clustered::ClusteredVariant;
use super::submitted::SubmittedVariant;
use super::VariantType;
use crate::{LodestoneError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Updated,
    Merged,
    Deprecated,
    Split,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventType::Updated => "UPDATED",
            EventType::Merged => "MERGED",
            EventType::Deprecated => "DEPRECATED",
            EventType::Split => "SPLIT",
        };
        write!(f, "{}", name)
    }
}

/// Pre-merge state of a clustered variant, captured in its MERGED record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredVariantSnapshot {
    pub assembly: String,
    pub contig: String,
    pub start: u64,
    pub variant_type: VariantType,
    pub validated: bool,
}

impl From<&ClusteredVariant> for ClusteredVariantSnapshot {
    fn from(variant: &ClusteredVariant) -> Self {
        Self {
            assembly: variant.assembly.clone(),
            contig: variant.contig.clone(),
            start: variant.start,
            variant_type: variant.variant_type,
            validated: variant.validated,
        }
    }
}

/// Pre-update state of a submitted variant, captured when its clustered
/// accession is re-pointed. `clustered_accession` holds the old value,
/// which is what the merge reconstructor joins on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedVariantSnapshot {
    pub assembly: String,
    pub contig: String,
    pub start: u64,
    pub variant_type: VariantType,
    pub reference: String,
    pub alternate: String,
    pub study: String,
    pub clustered_accession: Option<u64>,
    pub validated: bool,
    pub alleles_match: bool,
    pub assembly_match: bool,
    pub supported_by_evidence: bool,
}

impl From<&SubmittedVariant> for SubmittedVariantSnapshot {
    fn from(variant: &SubmittedVariant) -> Self {
        Self {
            assembly: variant.assembly.clone(),
            contig: variant.contig.clone(),
            start: variant.start,
            variant_type: variant.variant_type,
            reference: variant.reference.clone(),
            alternate: variant.alternate.clone(),
            study: variant.study.clone(),
            clustered_accession: variant.clustered_accession,
            validated: variant.validated,
            alleles_match: variant.alleles_match,
            assembly_match: variant.assembly_match,
            supported_by_evidence: variant.supported_by_evidence,
        }
    }
}

/// One history record for an accessioned entity.
///
/// `merge_into` is present only for MERGED events. MERGED and UPDATED
/// records written by this engine carry exactly one inactive snapshot;
/// more than one signals a logic defect elsewhere and readers must fail
/// loudly instead of picking one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation<S> {
    pub id: String,
    pub event: EventType,
    /// Subject accession
    pub accession: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_into: Option<u64>,
    pub reason: String,
    pub created: DateTime<Utc>,
    pub inactive: Vec<S>,
}

pub type ClusteredOperation = Operation<ClusteredVariantSnapshot>;
pub type SubmittedOperation = Operation<SubmittedVariantSnapshot>;

impl<S> Operation<S> {
    /// The single pre-change snapshot this record was written with.
    pub fn single_inactive(&self) -> Result<&S> {
        if self.inactive.len() != 1 {
            return Err(LodestoneError::InvariantViolation(format!(
                "operation '{}' must carry exactly one inactive object, found {}",
                self.id,
                self.inactive.len()
            )));
        }
        Ok(&self.inactive[0])
    }
}

impl ClusteredOperation {
    /// Record the merge of `accession` into `merge_into`.
    pub fn merged(merged: &ClusteredVariant, merge_into: u64) -> Self {
        Self {
            id: format!("RS_MERGED_{}_{}", merged.accession, merge_into),
            event: EventType::Merged,
            accession: merged.accession,
            merge_into: Some(merge_into),
            reason: format!(
                "Original rs{} was merged into rs{}.",
                merged.accession, merge_into
            ),
            created: Utc::now(),
            inactive: vec![ClusteredVariantSnapshot::from(merged)],
        }
    }
}

impl SubmittedOperation {
    /// Record the re-pointing of a submitted variant from `old_accession`
    /// to `new_accession`; the snapshot captures the pre-update state.
    pub fn clustered_accession_updated(
        before: &SubmittedVariant,
        old_accession: u64,
        new_accession: u64,
    ) -> Self {
        Self {
            id: format!(
                "SS_UPDATED_{}_{}_{}",
                before.accession, old_accession, new_accession
            ),
            event: EventType::Updated,
            accession: before.accession,
            merge_into: None,
            reason: format!(
                "Clustered variant accession updated from rs{} to rs{}.",
                old_accession, new_accession
            ),
            created: Utc::now(),
            inactive: vec![SubmittedVariantSnapshot::from(before)],
        }
    }
}
