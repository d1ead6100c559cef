//! Orphan blob collection command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::sweep_unreferenced_blobs;

#[derive(Debug, Args)]
pub struct GcArgs {}

pub fn execute(_args: GcArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;
    let report = sweep_unreferenced_blobs(&mut conn)?;

    println!(
        "Reclaimed {} blobs ({} bytes)",
        report.blobs_reclaimed, report.bytes_reclaimed
    );
    Ok(())
}
