//! Domain model for variant submissions, clusters and their history

pub mod clustered;
pub mod operation;
pub mod submitted;

pub use clustered::{ClusteredVariant, SiteKey};
pub use operation::{
    ClusteredOperation, ClusteredVariantSnapshot, EventType, Operation, SubmittedOperation,
    SubmittedVariantSnapshot,
};
pub use submitted::SubmittedVariant;

use serde::{Deserialize, Serialize};

/// Classification of a variant by the shape of its alleles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantType {
    Snv,
    Mnv,
    Ins,
    Del,
    Indel,
    Cnv,
}

impl std::fmt::Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariantType::Snv => "SNV",
            VariantType::Mnv => "MNV",
            VariantType::Ins => "INS",
            VariantType::Del => "DEL",
            VariantType::Indel => "INDEL",
            VariantType::Cnv => "CNV",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for VariantType {
    type Err = crate::LodestoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SNV" => Ok(VariantType::Snv),
            "MNV" => Ok(VariantType::Mnv),
            "INS" => Ok(VariantType::Ins),
            "DEL" => Ok(VariantType::Del),
            "INDEL" => Ok(VariantType::Indel),
            "CNV" => Ok(VariantType::Cnv),
            _ => Err(crate::LodestoneError::Parse(format!(
                "Unknown variant type: {}",
                s
            ))),
        }
    }
}
