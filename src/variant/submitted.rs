use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::clustered::SiteKey;
use super::VariantType;

/// One study's observation of an allele at a position.
///
/// The `clustered_accession` reference is null until the clustering engine
/// establishes the identity of the variant's cluster; import never sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedVariant {
    /// Submitted-variant (SS) accession, issued at import time
    pub accession: u64,
    pub assembly: String,
    /// Canonical contig name (INSDC), normalized before import
    pub contig: String,
    /// 1-based start position
    pub start: u64,
    pub variant_type: VariantType,
    pub reference: String,
    pub alternate: String,
    pub study: String,
    #[serde(default)]
    pub validated: bool,
    #[serde(default = "default_true")]
    pub alleles_match: bool,
    #[serde(default = "default_true")]
    pub assembly_match: bool,
    #[serde(default)]
    pub supported_by_evidence: bool,
    /// Clustered-variant (RS) accession, set only by the clustering engine
    #[serde(default)]
    pub clustered_accession: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl SubmittedVariant {
    /// Synthetic document identity derived from the fields that define the
    /// submission, so re-inserting the same observation hits the same key.
    pub fn id(&self) -> String {
        let summary = format!(
            "{}_{}_{}_{}_{}_{}",
            self.assembly, self.study, self.contig, self.start, self.reference, self.alternate
        );
        let digest = Sha256::digest(summary.as_bytes());
        hex::encode(digest)
    }

    /// The site this submission belongs to, for cluster matching
    pub fn site_key(&self) -> SiteKey {
        SiteKey {
            assembly: self.assembly.clone(),
            contig: self.contig.clone(),
            start: self.start,
            variant_type: self.variant_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(study: &str, start: u64) -> SubmittedVariant {
        SubmittedVariant {
            accession: 5_000_000_001,
            assembly: "GCA_000000001.1".to_string(),
            contig: "CM000001.1".to_string(),
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

    #[test]
    fn test_id_is_stable() {
        let a = variant("S1", 3000);
        let b = variant("S1", 3000);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id().len(), 64);
    }

    #[test]
    fn test_id_discriminates_defining_fields() {
        let a = variant("S1", 3000);
        let other_study = variant("S2", 3000);
        let other_position = variant("S1", 3001);
        assert_ne!(a.id(), other_study.id());
        assert_ne!(a.id(), other_position.id());
    }

    #[test]
    fn test_id_ignores_clustering_state() {
        let mut a = variant("S1", 3000);
        let before = a.id();
        a.clustered_accession = Some(3_000_000_000);
        assert_eq!(before, a.id());
    }

    #[test]
    fn test_site_key() {
        let a = variant("S1", 3000);
        let key = a.site_key();
        assert_eq!(key.contig, "CM000001.1");
        assert_eq!(key.start, 3000);
        assert_eq!(key.variant_type, VariantType::Snv);
    }
}
