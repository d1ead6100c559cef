//! Snapshot creation command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::{create_snapshot, SnapshotOptions};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Directory to capture
    #[arg(long)]
    pub target_directory: PathBuf,

    /// Fail instead of skipping files that cannot be captured
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: SnapshotArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;

    let report = create_snapshot(
        &mut conn,
        &args.target_directory,
        SnapshotOptions {
            strict: args.strict,
            ..SnapshotOptions::default()
        },
    )?;

    for skipped in &report.skipped {
        eprintln!(
            "warning: skipped {} ({})",
            skipped.path.display(),
            skipped.reason.as_str()
        );
    }
    for failure in &report.failures {
        eprintln!(
            "warning: could not read {}: {}",
            failure.path.display(),
            failure.error
        );
    }

    println!("Snapshot {} created.", report.snapshot_id);
    println!(
        "  files: {}, new blobs: {}, bytes: {}",
        report.files, report.blobs_inserted, report.bytes
    );

    Ok(())
}
