pub mod cli;
pub mod clustering;
pub mod contig;
pub mod core;
pub mod release;
pub mod storage;
pub mod variant;

pub use crate::clustering::{AccessionAllocator, ClusteringEngine, MonotonicBlockAllocator};
pub use crate::contig::ContigMapping;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LodestoneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Contig '{0}' not found in the assembly report")]
    ContigNotFound(String),

    #[error("Contig '{0}' only matches a non-identical synonym")]
    NonIdenticalSynonym(String),

    #[error("Contig '{0}' matches more than one assembly report entry")]
    AmbiguousContig(String),

    #[error("Accession allocation failed: {0}")]
    Allocation(String),

    #[error("Bulk write failed after {written} documents were written: {message}")]
    BulkWrite { written: u64, message: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{0}")]
    Other(String),
}

impl LodestoneError {
    /// Validation errors reject a single input item; the caller decides
    /// whether to skip it or abort the run. Everything else is fatal to
    /// the current chunk.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LodestoneError::ContigNotFound(_)
                | LodestoneError::NonIdenticalSynonym(_)
                | LodestoneError::AmbiguousContig(_)
        )
    }
}

impl From<serde_json::Error> for LodestoneError {
    fn from(err: serde_json::Error) -> Self {
        LodestoneError::Parse(err.to_string())
    }
}

impl From<anyhow::Error> for LodestoneError {
    fn from(err: anyhow::Error) -> Self {
        LodestoneError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LodestoneError>;
