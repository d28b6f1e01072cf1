use clap::Parser;
use colored::*;
use lodestone::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging with LODESTONE_LOG environment variable support
    let log_level = std::env::var("LODESTONE_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.downcast_ref::<lodestone::LodestoneError>() {
            Some(lodestone::LodestoneError::Config(_)) => 2,
            Some(lodestone::LodestoneError::Io(_)) => 3,
            Some(lodestone::LodestoneError::Parse(_)) => 4,
            Some(lodestone::LodestoneError::Store(_)) => 5,
            Some(err) if err.is_validation() => 6,
            Some(lodestone::LodestoneError::Allocation(_)) => 7,
            Some(lodestone::LodestoneError::InvariantViolation(_)) => 8,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Configure thread pool
    let num_threads = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .expect("Failed to initialize thread pool");

    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    match cli.command {
        Commands::Cluster(args) => lodestone::cli::commands::cluster::run(args),
        Commands::ExportMerged(args) => lodestone::cli::commands::export_merged::run(args),
        Commands::Contigs(args) => lodestone::cli::commands::contigs::run(args),
    }
}
