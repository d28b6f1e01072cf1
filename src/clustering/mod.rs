//! Accession allocation and the clustering decision engine

pub mod allocator;
pub mod engine;

pub use allocator::{AccessionAllocator, MonotonicBlockAllocator};
pub use engine::{lowest_accession_wins, ChunkSummary, ClusteringEngine, MergePolicy};
