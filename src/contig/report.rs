use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{LodestoneError, Result};

/// One row of an NCBI-style assembly report: the names one physical
/// contig goes by, plus whether its GenBank and RefSeq sequences are
/// declared identical (the `Relationship` column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigRow {
    pub sequence_name: String,
    pub assigned_molecule: Option<String>,
    pub genbank: Option<String>,
    pub refseq: Option<String>,
    pub ucsc: Option<String>,
    pub genbank_refseq_identical: bool,
}

// Column layout of assembly_report.txt files:
// Sequence-Name  Sequence-Role  Assigned-Molecule  Assigned-Molecule-Location/Type
// GenBank-Accn  Relationship  RefSeq-Accn  Assembly-Unit  Sequence-Length  UCSC-style-name
const SEQUENCE_NAME_COLUMN: usize = 0;
const ASSIGNED_MOLECULE_COLUMN: usize = 2;
const GENBANK_COLUMN: usize = 4;
const RELATIONSHIP_COLUMN: usize = 5;
const REFSEQ_COLUMN: usize = 6;
const UCSC_COLUMN: usize = 9;
const MIN_COLUMNS: usize = 7;

fn optional(fields: &[&str], index: usize) -> Option<String> {
    fields
        .get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && *value != "na")
        .map(|value| value.to_string())
}

/// Parse an assembly report from any buffered reader. Comment lines
/// (leading `#`) and blank lines are skipped.
pub fn parse_report<R: BufRead>(reader: R) -> Result<Vec<ContigRow>> {
    let mut rows = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(LodestoneError::Parse(format!(
                "Assembly report line {} has {} columns, expected at least {}",
                number + 1,
                fields.len(),
                MIN_COLUMNS
            )));
        }

        let sequence_name = fields[SEQUENCE_NAME_COLUMN].trim();
        if sequence_name.is_empty() {
            return Err(LodestoneError::Parse(format!(
                "Assembly report line {} is missing a sequence name",
                number + 1
            )));
        }

        rows.push(ContigRow {
            sequence_name: sequence_name.to_string(),
            assigned_molecule: optional(&fields, ASSIGNED_MOLECULE_COLUMN),
            genbank: optional(&fields, GENBANK_COLUMN),
            refseq: optional(&fields, REFSEQ_COLUMN),
            ucsc: optional(&fields, UCSC_COLUMN),
            genbank_refseq_identical: fields[RELATIONSHIP_COLUMN].trim() == "=",
        });
    }

    Ok(rows)
}

/// Parse an assembly report file.
pub fn parse_report_file<P: AsRef<Path>>(path: P) -> Result<Vec<ContigRow>> {
    let file = File::open(path)?;
    parse_report(BufReader::new(file))
}
