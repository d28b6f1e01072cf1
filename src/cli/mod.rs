pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lodestone",
    version,
    about = "Stable accession clustering for genomic variant submissions",
    long_about = "Lodestone assigns permanent clustered accessions to genomic variant \
                  submissions, deduplicating co-located submissions into canonical \
                  clusters, healing duplicate clusters by merging, and reconstructing \
                  the current view of merged variants from the operation history."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster the submitted variants of one or more assemblies
    Cluster(commands::cluster::ClusterArgs),

    /// Export the reconciled view of merged variants
    ExportMerged(commands::export_merged::ExportMergedArgs),

    /// Resolve contig names against an assembly report
    Contigs(commands::contigs::ContigsArgs),
}
