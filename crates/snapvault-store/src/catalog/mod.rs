//! Snapshot catalog.
//!
//! The catalog maps each snapshot id to its creation time and its
//! (relative path → digest) entries.
//!
//! ## Responsibilities
//!
//! - Register snapshot rows and their entries (inside a caller-owned write
//!   transaction, together with the blob inserts)
//! - Detach a snapshot: remove it and its entries atomically, returning the
//!   digests it referenced
//! - Read-only listing, entry enumeration, integrity and statistics queries
//!
//! ## Non-Responsibilities
//!
//! - Directory traversal and blob reclamation (handled by `snapvault-engine`)

pub mod persist;
pub mod query;

pub use persist::{detach_snapshot, insert_entry, insert_snapshot, DetachedSnapshot};
pub use query::{
    dangling_entries, fetch_snapshot, fetch_summary, list_entries, list_snapshots, store_stats,
    StoreStats,
};
