use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use crate::clustering::{ClusteringEngine, MonotonicBlockAllocator};
use crate::core::config::{load_config, Config};
use crate::storage::{ClusteringCounts, MemoryStore, VariantStore};

#[derive(Args)]
pub struct ClusterArgs {
    /// Store directory holding the variant collections (falls back to the
    /// config file's store path)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Assembly accession(s) to cluster; each assembly is a disjoint
    /// partition and partitions run in parallel
    #[arg(short, long, required = true, num_args = 1..)]
    pub assembly: Vec<String>,

    /// Variants per chunk (overrides the config file)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: ClusterArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let chunk_size = args.chunk_size.unwrap_or(config.clustering.chunk_size);

    let store_dir = args
        .store
        .clone()
        .or_else(|| config.store.path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("No store directory given on the command line or in the config"))?;

    let store = MemoryStore::open(&store_dir)
        .with_context(|| format!("Failed to open store at {}", store_dir.display()))?;

    // Resume above anything already issued so accessions are permanent
    // across restarts.
    let first = store
        .max_clustered_accession()
        .map(|max| max + 1)
        .unwrap_or(config.accessioning.first_accession)
        .max(config.accessioning.first_accession);
    let allocator = MonotonicBlockAllocator::with_range(first, config.accessioning.max_accession);

    let pending: usize = args
        .assembly
        .iter()
        .map(|assembly| {
            store
                .unclustered_submitted_ids(assembly)
                .map(|ids| ids.len())
                .unwrap_or(0)
        })
        .sum();
    let progress = ProgressBar::new(pending as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    let counts = ClusteringCounts::new();
    let summaries: anyhow::Result<Vec<_>> = args
        .assembly
        .par_iter()
        .map(|assembly| {
            let engine = ClusteringEngine::new(&store, &allocator, &counts);
            let summary = engine
                .run_with_progress(assembly, chunk_size, |read| {
                    progress.inc(read as u64);
                })
                .with_context(|| format!("Clustering failed for {}", assembly))?;
            Ok((assembly.clone(), summary))
        })
        .collect();
    let summaries = summaries?;
    progress.finish_and_clear();

    store
        .flush(&store_dir)
        .with_context(|| format!("Failed to flush store at {}", store_dir.display()))?;

    for (assembly, summary) in &summaries {
        info!(
            assembly = assembly.as_str(),
            read = summary.read,
            created = summary.created,
            merged = summary.merged,
            "assembly clustered"
        );
        println!(
            "{}: {} read, {} clusters created, {} merged, {} attached, {} re-pointed",
            assembly,
            summary.read,
            summary.created,
            summary.merged,
            summary.attached,
            summary.repointed
        );
    }
    println!("Totals: {}", counts);

    Ok(())
}
