//! snapvault CLI
//!
//! Command-line interface for content-addressed directory snapshots

use clap::{Parser, Subcommand, ValueEnum};
use snapvault_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "snapvault")]
#[command(about = "snapvault - deduplicating directory snapshots", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: commands::StoreArgs,

    /// Structured log output on stderr
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Off)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Off,
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture a directory as a new snapshot
    Snapshot(commands::snapshot::SnapshotArgs),
    /// List snapshots
    List(commands::list::ListArgs),
    /// Recreate a snapshot's files in a directory
    Restore(commands::restore::RestoreArgs),
    /// Delete a snapshot and reclaim content no other snapshot uses
    Prune(commands::prune::PruneArgs),
    /// Show one snapshot's entries
    Show(commands::show::ShowArgs),
    /// Check every stored blob against its digest
    Verify(commands::verify::VerifyArgs),
    /// Reclaim blobs no snapshot references
    Gc(commands::gc::GcArgs),
    /// Store totals
    Stats(commands::stats::StatsArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormat::Off => {}
        LogFormat::Text => init(Profile::Development),
        LogFormat::Json => init(Profile::Production),
    }

    let store = &cli.store;
    let result = match cli.command {
        Commands::Snapshot(args) => commands::snapshot::execute(args, store),
        Commands::List(args) => commands::list::execute(args, store),
        Commands::Restore(args) => commands::restore::execute(args, store),
        Commands::Prune(args) => commands::prune::execute(args, store),
        Commands::Show(args) => commands::show::execute(args, store),
        Commands::Verify(args) => commands::verify::execute(args, store),
        Commands::Gc(args) => commands::gc::execute(args, store),
        Commands::Stats(args) => commands::stats::execute(args, store),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
