//! Snapshot prune command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::{prune_snapshot, PruneOutcome};

#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Snapshot to delete
    #[arg(long)]
    pub snapshot: i64,
}

pub fn execute(args: PruneArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;

    match prune_snapshot(&mut conn, args.snapshot)? {
        PruneOutcome::NotFound { snapshot_id } => {
            println!("Snapshot {} not found; nothing pruned.", snapshot_id);
        }
        PruneOutcome::Pruned(report) => {
            println!("Snapshot {} pruned.", report.snapshot_id);
            println!(
                "  entries removed: {}, blobs reclaimed: {}, bytes reclaimed: {}",
                report.entries_removed, report.blobs_reclaimed, report.bytes_reclaimed
            );
        }
    }

    Ok(())
}
