//! Store statistics command

use super::{CommandResult, StoreArgs};
use clap::Args;
use snapvault_engine::commands::listing::store_stats;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatsArgs, store: &StoreArgs) -> CommandResult {
    let conn = store.open()?;
    let stats = store_stats(&conn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("snapshots:  {}", stats.snapshots);
    println!("entries:    {}", stats.entries);
    println!("blobs:      {}", stats.blobs);
    println!("blob bytes: {}", stats.blob_bytes);
    Ok(())
}
