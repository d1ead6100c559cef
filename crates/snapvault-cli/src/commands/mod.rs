//! Subcommand implementations
//!
//! Each module exposes an `Args` struct and an `execute` function. Outcomes
//! the engine reports as values (not found, partial restore) are printed
//! here; only errors reach `main` and become exit code 1.

use clap::Args;
use rusqlite::Connection;
use snapvault_store::db::{open_store, StoreConfig, DEFAULT_DB_PATH};
use std::path::PathBuf;
use std::time::Duration;

pub mod gc;
pub mod list;
pub mod prune;
pub mod restore;
pub mod show;
pub mod snapshot;
pub mod stats;
pub mod verify;

/// Result type shared by every subcommand
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Where the store lives and how long to wait for it
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Path of the snapshot database
    #[arg(long, global = true, env = "SNAPVAULT_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// How long to wait for a competing writer, in milliseconds
    #[arg(
        long,
        global = true,
        env = "SNAPVAULT_BUSY_TIMEOUT_MS",
        default_value_t = 5000
    )]
    pub busy_timeout_ms: u64,
}

impl StoreArgs {
    pub fn config(&self) -> StoreConfig {
        StoreConfig::new(&self.db).with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub fn open(&self) -> Result<Connection, Box<dyn std::error::Error>> {
        Ok(open_store(&self.config())?)
    }
}
