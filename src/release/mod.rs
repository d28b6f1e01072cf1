//! Reconstruction of the current view of merged variants, for export

pub mod export;
pub mod merged;

pub use merged::{reconstruct_merged, MergedVariant, MergedVariantReader};
