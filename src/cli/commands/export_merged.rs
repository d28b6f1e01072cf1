use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::release::export::{write_jsonl, write_tsv};
use crate::release::merged::reconstruct_merged;
use crate::storage::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Tsv,
    Jsonl,
}

#[derive(Args)]
pub struct ExportMergedArgs {
    /// Store directory holding the variant collections
    #[arg(short, long)]
    pub store: PathBuf,

    /// Assembly accession to reconstruct
    #[arg(short, long)]
    pub assembly: String,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "tsv")]
    pub format: ExportFormat,
}

pub fn run(args: ExportMergedArgs) -> anyhow::Result<()> {
    let store = MemoryStore::open(&args.store)
        .with_context(|| format!("Failed to open store at {}", args.store.display()))?;

    let rows = reconstruct_merged(&store, &args.assembly)?;
    info!(
        assembly = args.assembly.as_str(),
        rows = rows.len(),
        "reconstructed merged variants"
    );

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    match args.format {
        ExportFormat::Tsv => write_tsv(&rows, &mut writer)?,
        ExportFormat::Jsonl => write_jsonl(&rows, &mut writer)?,
    }
    writer.flush()?;

    eprintln!("Exported {} merged variants", rows.len());
    Ok(())
}
