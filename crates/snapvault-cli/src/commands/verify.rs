//! Store verification command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::commands::verify::verify_store;

#[derive(Debug, Args)]
pub struct VerifyArgs {}

pub fn execute(_args: VerifyArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;
    let report = verify_store(&mut conn)?;

    for corrupt in &report.corrupt_blobs {
        eprintln!("corrupt blob {}: {}", corrupt.digest, corrupt.error);
    }
    for entry in &report.dangling_entries {
        eprintln!(
            "snapshot {} entry {} references missing blob {}",
            entry.snapshot_id, entry.relative_path, entry.digest
        );
    }

    println!(
        "Checked {} blobs: {} corrupt, {} dangling entries",
        report.blobs_checked,
        report.corrupt_blobs.len(),
        report.dangling_entries.len()
    );

    if !report.is_healthy() {
        return Err("store failed verification".into());
    }
    Ok(())
}
