//! Snapshot restore command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::{restore_snapshot, RestoreOptions, RestoreOutcome};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Snapshot to restore
    #[arg(long)]
    pub snapshot_number: i64,

    /// Directory to write the files into (created if missing)
    #[arg(long)]
    pub output_directory: PathBuf,

    /// Stop at the first missing or corrupt blob
    #[arg(long)]
    pub fail_fast: bool,
}

pub fn execute(args: RestoreArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;

    let outcome = restore_snapshot(
        &mut conn,
        args.snapshot_number,
        &args.output_directory,
        RestoreOptions {
            abort_on_integrity_error: args.fail_fast,
        },
    )?;

    let report = match outcome {
        RestoreOutcome::NotFound { snapshot_id } => {
            println!("Snapshot {} not found; nothing restored.", snapshot_id);
            return Ok(());
        }
        RestoreOutcome::Restored(report) => report,
    };

    for failure in &report.failures {
        eprintln!("error: {}: {}", failure.relative_path, failure.error);
    }

    println!(
        "Snapshot {} restored to {} ({} files, {} bytes)",
        report.snapshot_id,
        args.output_directory.display(),
        report.restored,
        report.bytes_written
    );

    if !report.is_complete() {
        return Err(format!(
            "{} entries of snapshot {} could not be restored",
            report.failures.len(),
            report.snapshot_id
        )
        .into());
    }

    Ok(())
}
