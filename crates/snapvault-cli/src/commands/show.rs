//! Snapshot detail command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::commands::listing::show_snapshot;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Snapshot to show
    #[arg(long)]
    pub snapshot: i64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ShowArgs, store: &StoreArgs) -> CommandResult {
    let mut conn = store.open()?;

    let Some(detail) = show_snapshot(&mut conn, args.snapshot)? else {
        println!("Snapshot {} not found.", args.snapshot);
        return Ok(());
    };

    if args.json {
        let value = serde_json::json!({
            "snapshot": detail.summary,
            "entries": detail.entries,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let summary = &detail.summary;
    println!("Snapshot {}", summary.id);
    println!("  created: {}", summary.created_at_display());
    if let Some(root) = &summary.source_root {
        println!("  source:  {}", root);
    }
    println!(
        "  files:   {} ({} bytes)",
        summary.entry_count, summary.total_bytes
    );
    for entry in &detail.entries {
        println!("{}  {}", entry.digest.short(), entry.relative_path);
    }

    Ok(())
}
