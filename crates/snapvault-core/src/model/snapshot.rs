//! Snapshot catalog records.

use crate::digest::ContentDigest;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Catalog-assigned snapshot identifier. Strictly increasing, never reused.
pub type SnapshotId = i64;

/// A row of the `snapshots` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    /// Absolute path of the directory that was captured
    pub source_root: Option<String>,
}

/// Listing view of a snapshot with aggregate entry information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub source_root: Option<String>,
    pub entry_count: u64,
    /// Sum of entry sizes (shared blobs counted once per entry)
    pub total_bytes: u64,
}

/// One file of a snapshot: "this path, in this snapshot, has this content".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub snapshot_id: SnapshotId,
    /// `/`-separated path relative to the captured root
    pub relative_path: String,
    pub digest: ContentDigest,
}

/// Convert catalog milliseconds to a UTC timestamp.
///
/// Out-of-range values clamp to the Unix epoch rather than failing a listing.
pub fn timestamp_from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

impl SnapshotRecord {
    /// Creation time formatted like `2024-05-01 12:30:00`
    pub fn created_at_display(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl SnapshotSummary {
    /// Creation time formatted like `2024-05-01 12:30:00`
    pub fn created_at_display(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
