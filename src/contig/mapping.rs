use std::collections::HashMap;
use std::path::Path;

use super::report::{parse_report_file, ContigRow};
use crate::{LodestoneError, Result};

/// The naming conventions a contig may be referred to by, in the order
/// lookups consult them. GenBank comes first: an identical match on the
/// canonical accession always wins over any synonym match elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamingConvention {
    GenBank,
    SequenceName,
    RefSeq,
    Ucsc,
    AssignedMolecule,
}

const LOOKUP_ORDER: [NamingConvention; 5] = [
    NamingConvention::GenBank,
    NamingConvention::SequenceName,
    NamingConvention::RefSeq,
    NamingConvention::Ucsc,
    NamingConvention::AssignedMolecule,
];

/// Per-assembly mapping from any recognized contig name to the canonical
/// contig name, built once from an assembly report.
#[derive(Debug)]
pub struct ContigMapping {
    rows: Vec<ContigRow>,
    indexes: HashMap<&'static str, HashMap<String, Vec<usize>>>,
}

fn convention_key(convention: NamingConvention) -> &'static str {
    match convention {
        NamingConvention::GenBank => "genbank",
        NamingConvention::SequenceName => "sequence-name",
        NamingConvention::RefSeq => "refseq",
        NamingConvention::Ucsc => "ucsc",
        NamingConvention::AssignedMolecule => "assigned-molecule",
    }
}

impl ContigMapping {
    pub fn new(rows: Vec<ContigRow>) -> Self {
        let mut mapping = Self {
            rows,
            indexes: HashMap::new(),
        };
        for convention in LOOKUP_ORDER {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (position, row) in mapping.rows.iter().enumerate() {
                let name = match convention {
                    NamingConvention::GenBank => row.genbank.as_deref(),
                    NamingConvention::SequenceName => Some(row.sequence_name.as_str()),
                    NamingConvention::RefSeq => row.refseq.as_deref(),
                    NamingConvention::Ucsc => row.ucsc.as_deref(),
                    NamingConvention::AssignedMolecule => row.assigned_molecule.as_deref(),
                };
                if let Some(name) = name {
                    index.entry(name.to_string()).or_default().push(position);
                }
            }
            mapping.indexes.insert(convention_key(convention), index);
        }
        mapping
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(parse_report_file(path)?))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn canonical(&self, position: usize) -> &str {
        let row = &self.rows[position];
        row.genbank.as_deref().unwrap_or(&row.sequence_name)
    }

    /// Resolve any recognized contig name to the canonical contig name.
    ///
    /// Conventions are consulted in a fixed order, the canonical GenBank
    /// accession first, so a name literally present as a canonical value
    /// wins even when it also appears as another row's synonym. A name
    /// reachable only through the RefSeq column of a row whose GenBank and
    /// RefSeq sequences are not identical is rejected: the replacement
    /// would change which physical sequence the variant refers to.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        for convention in LOOKUP_ORDER {
            let index = &self.indexes[convention_key(convention)];
            let Some(positions) = index.get(name) else {
                continue;
            };

            if positions.len() > 1 {
                return Err(LodestoneError::AmbiguousContig(name.to_string()));
            }
            let position = positions[0];

            if convention == NamingConvention::RefSeq
                && !self.rows[position].genbank_refseq_identical
            {
                return Err(LodestoneError::NonIdenticalSynonym(name.to_string()));
            }

            return Ok(self.canonical(position));
        }

        Err(LodestoneError::ContigNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contig::report::parse_report;

    const REPORT: &str = "\
# Sequence-Name\tSequence-Role\tAssigned-Molecule\tAssigned-Molecule-Location/Type\tGenBank-Accn\tRelationship\tRefSeq-Accn\tAssembly-Unit\tSequence-Length\tUCSC-style-name
1\tassembled-molecule\t1\tChromosome\tCM000994.3\t=\tNC_000067.7\tC57BL/6J\t195471971\tchrom1
2\tassembled-molecule\t2\tChromosome\tCM000995.3\t=\tNC_000068.8\tC57BL/6J\t182113224\tchr2
MMCHR1_RANDOM_CTG1\tunlocalized-scaffold\t1\tChromosome\tGL456210.1\t=\tNT_166280.1\tC57BL/6J\t169725\tchr1_GL456210_random
MSCHRUN_CTG1\tunplaced-scaffold\tna\tna\tGL456378.1\t<>\tNT_without_synonym\tC57BL/6J\t31602\tna
";

    fn mapping() -> ContigMapping {
        ContigMapping::new(parse_report(REPORT.as_bytes()).unwrap())
    }

    #[test]
    fn test_all_conventions_resolve() {
        let mapping = mapping();
        assert_eq!(mapping.resolve("chrom1").unwrap(), "CM000994.3");
        assert_eq!(mapping.resolve("2").unwrap(), "CM000995.3");
        assert_eq!(mapping.resolve("NT_166280.1").unwrap(), "GL456210.1");
        assert_eq!(mapping.resolve("CM000994.3").unwrap(), "CM000994.3");
    }

    #[test]
    fn test_non_identical_synonym_is_rejected() {
        let err = mapping().resolve("NT_without_synonym").unwrap_err();
        assert!(matches!(err, LodestoneError::NonIdenticalSynonym(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_contig_is_rejected() {
        let err = mapping()
            .resolve("contig_not_present_in_assembly_report")
            .unwrap_err();
        assert!(matches!(err, LodestoneError::ContigNotFound(_)));
    }

    #[test]
    fn test_resolution_is_stateless() {
        let mapping = mapping();
        assert!(mapping.resolve("NT_166280.1").is_ok());
        assert!(mapping.resolve("NT_without_synonym").is_err());
        assert!(mapping.resolve("NT_166280.1").is_ok());
    }

    #[test]
    fn test_identical_match_beats_synonym_match() {
        // "GL456378.1" is the canonical accession of one row; give another
        // row a RefSeq synonym with the same spelling. The canonical match
        // must win even though the synonym row is non-identical.
        let report = "\
A_CTG\tunplaced-scaffold\tna\tna\tGL456378.1\t<>\tNT_000001.1\tunit\t100\tna
B_CTG\tunplaced-scaffold\tna\tna\tGL456400.1\t<>\tGL456378.1\tunit\t100\tna
";
        let mapping = ContigMapping::new(parse_report(report.as_bytes()).unwrap());
        assert_eq!(mapping.resolve("GL456378.1").unwrap(), "GL456378.1");
    }

    #[test]
    fn test_sequence_name_priority_over_assigned_molecule() {
        // Assigned molecule "1" covers both the chromosome and its
        // unlocalized scaffold; the sequence-name match must win before
        // the shared assigned-molecule entry is consulted.
        let mapping = mapping();
        assert_eq!(mapping.resolve("1").unwrap(), "CM000994.3");
    }

    #[test]
    fn test_duplicated_name_is_ambiguous() {
        let report = "\
CTG1\tunplaced-scaffold\tna\tna\tAC000001.1\t=\tNW_000001.1\tunit\t100\tshared
CTG2\tunplaced-scaffold\tna\tna\tAC000002.1\t=\tNW_000002.1\tunit\t100\tshared
";
        let mapping = ContigMapping::new(parse_report(report.as_bytes()).unwrap());
        let err = mapping.resolve("shared").unwrap_err();
        assert!(matches!(err, LodestoneError::AmbiguousContig(_)));
    }

    #[test]
    fn test_canonical_falls_back_to_sequence_name() {
        let report = "CTG_NA\tunplaced-scaffold\tna\tna\tna\t<>\tna\tunit\t100\tchrUn_1\n";
        let mapping = ContigMapping::new(parse_report(report.as_bytes()).unwrap());
        assert_eq!(mapping.resolve("chrUn_1").unwrap(), "CTG_NA");
    }
}
