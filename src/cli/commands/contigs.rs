use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::*;

use crate::contig::ContigMapping;

#[derive(Args)]
pub struct ContigsArgs {
    /// Assembly report the synonym table is built from
    #[arg(short, long)]
    pub report: PathBuf,

    /// Contig names to resolve
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Report invalid names but keep going instead of failing the run
    #[arg(long)]
    pub skip_invalid: bool,
}

pub fn run(args: ContigsArgs) -> anyhow::Result<()> {
    let mapping = ContigMapping::from_file(&args.report)
        .with_context(|| format!("Failed to read {}", args.report.display()))?;

    let mut invalid = 0usize;
    for name in &args.names {
        match mapping.resolve(name) {
            Ok(canonical) => println!("{}\t{}", name, canonical),
            Err(e) if e.is_validation() && args.skip_invalid => {
                invalid += 1;
                eprintln!("{} {}", "skipped:".yellow(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if invalid > 0 {
        eprintln!("{} of {} names skipped", invalid, args.names.len());
    }
    Ok(())
}
