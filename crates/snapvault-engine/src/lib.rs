//! snapvault engine - orchestration layer
//!
//! Provides the snapshot, restore, prune, listing and verification commands
//! that coordinate directory traversal with the SQLite blob store and catalog.

pub mod commands;

pub use commands::prune::{prune_snapshot, sweep_unreferenced_blobs, PruneOutcome};
pub use commands::restore::{restore_snapshot, RestoreOptions, RestoreOutcome};
pub use commands::snapshot::{create_snapshot, SnapshotOptions, SnapshotReport};
