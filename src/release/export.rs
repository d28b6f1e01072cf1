//! Flat-file renderings of the reconciled merged-variant stream.

use std::io::Write;

use super::merged::MergedVariant;
use crate::Result;

pub const TSV_HEADER: &str = "accession\tmerged_from\tcontig\tstart\ttype\treference\talternate\tstudy\tvalidated\tss_validated\talleles_match\tassembly_match\tsupported_by_evidence";

/// Tab-separated output, one row per reconciled variant, stable column
/// order matching [`TSV_HEADER`].
pub fn write_tsv<W: Write>(rows: &[MergedVariant], mut writer: W) -> Result<()> {
    writeln!(writer, "{}", TSV_HEADER)?;
    for row in rows {
        writeln!(
            writer,
            "rs{}\trs{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.accession,
            row.merged_from,
            row.contig,
            row.start,
            row.variant_type,
            row.reference,
            row.alternate,
            row.study,
            row.validated,
            row.ss_validated,
            row.alleles_match,
            row.assembly_match,
            row.supported_by_evidence
        )?;
    }
    Ok(())
}

/// One JSON document per line.
pub fn write_jsonl<W: Write>(rows: &[MergedVariant], mut writer: W) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
