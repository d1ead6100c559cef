//! Snapshot listing command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::commands::listing::list_snapshots;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ListArgs, store: &StoreArgs) -> CommandResult {
    let conn = store.open()?;
    let snapshots = list_snapshots(&conn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    println!("{}", row("SNAPSHOT", "TIMESTAMP", "FILES", "SIZE"));
    for snapshot in &snapshots {
        println!(
            "{}",
            row(
                &snapshot.id.to_string(),
                &snapshot.created_at_display(),
                &snapshot.entry_count.to_string(),
                &snapshot.total_bytes.to_string(),
            )
        );
    }

    Ok(())
}

fn row(id: &str, timestamp: &str, files: &str, size: &str) -> String {
    format!("{:<8}  {:<19}  {:>5}  {:>10}", id, timestamp, files, size)
}
