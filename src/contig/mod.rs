//! Contig name normalization across naming conventions.
//!
//! An assembly report lists, for every physical contig, the names it goes
//! by: sequence name, assigned molecule, GenBank accession, RefSeq
//! accession and UCSC-style name. The mapping built from it resolves any
//! recognized name to one canonical contig name before variants reach the
//! clustering engine.

pub mod mapping;
pub mod report;

pub use mapping::ContigMapping;
pub use report::{parse_report, parse_report_file, ContigRow};
