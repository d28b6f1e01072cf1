use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VariantType;

/// The identity of a variant site: at most one active cluster may exist
/// per key at any instant. Duplicates are transient and healed by merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteKey {
    pub assembly: String,
    pub contig: String,
    pub start: u64,
    pub variant_type: VariantType,
}

impl std::fmt::Display for SiteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.assembly, self.contig, self.start, self.variant_type
        )
    }
}

/// The canonical deduplicated cluster for a site, identified by a
/// permanent accession that is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredVariant {
    /// Clustered-variant (RS) accession
    pub accession: u64,
    pub assembly: String,
    pub contig: String,
    pub start: u64,
    pub variant_type: VariantType,
    #[serde(default)]
    pub validated: bool,
    pub created: DateTime<Utc>,
    /// False once this cluster has been merged into another
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl ClusteredVariant {
    pub fn new(accession: u64, site: &SiteKey) -> Self {
        Self {
            accession,
            assembly: site.assembly.clone(),
            contig: site.contig.clone(),
            start: site.start,
            variant_type: site.variant_type,
            validated: false,
            created: Utc::now(),
            active: true,
        }
    }

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

    #[test]
    fn test_new_cluster_is_active() {
        let site = SiteKey {
            assembly: "GCA_000000001.1".to_string(),
            contig: "CM000001.1".to_string(),
            start: 5000,
            variant_type: VariantType::Snv,
        };
        let clustered = ClusteredVariant::new(3_000_000_000, &site);
        assert!(clustered.active);
        assert!(!clustered.validated);
        assert_eq!(clustered.site_key(), site);
    }

    #[test]
    fn test_site_key_display() {
        let site = SiteKey {
            assembly: "GCA_000000001.1".to_string(),
            contig: "CM000001.1".to_string(),
            start: 5000,
            variant_type: VariantType::Del,
        };
        assert_eq!(format!("{}", site), "GCA_000000001.1:CM000001.1:5000:DEL");
    }
}
