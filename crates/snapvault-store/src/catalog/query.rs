//! Read-only catalog queries.
//!
//! None of these functions mutate state. Run several of them inside one
//! `begin_read` transaction when they must observe the same catalog state.

use crate::errors::{sqlite_op, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use snapvault_core::digest::ContentDigest;
use snapvault_core::model::{
    timestamp_from_millis, SnapshotEntry, SnapshotId, SnapshotRecord, SnapshotSummary,
};

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub snapshots: u64,
    pub entries: u64,
    pub blobs: u64,
    /// Sum of stored blob sizes (each distinct content counted once)
    pub blob_bytes: u64,
}

/// Fetch one snapshot row.
///
/// Returns `Ok(None)` when no snapshot has this id; a missing snapshot is a
/// normal outcome for callers, not an error.
///
/// # Errors
///
/// - `Persistence` - SQLite query failed
pub fn fetch_snapshot(conn: &Connection, snapshot_id: SnapshotId) -> Result<Option<SnapshotRecord>> {
    let row = conn
        .query_row(
            "SELECT id, created_at, source_root FROM snapshots WHERE id = ?1",
            [snapshot_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()
        .map_err(sqlite_op("fetch_snapshot"))?;

    Ok(row.map(|(id, created_at, source_root)| SnapshotRecord {
        id,
        created_at: timestamp_from_millis(created_at),
        source_root,
    }))
}

/// List every snapshot in ascending id order with its entry count and size.
///
/// # Errors
///
/// - `Persistence` - SQLite query failed
pub fn list_snapshots(conn: &Connection) -> Result<Vec<SnapshotSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.created_at, s.source_root,
                    COUNT(e.relative_path), COALESCE(SUM(b.size), 0)
             FROM snapshots s
             LEFT JOIN snapshot_entries e ON e.snapshot_id = s.id
             LEFT JOIN blobs b ON b.digest = e.digest
             GROUP BY s.id
             ORDER BY s.id ASC",
        )
        .map_err(sqlite_op("list_snapshots"))?;

    let rows = stmt
        .query_map([], summary_from_row)
        .map_err(sqlite_op("list_snapshots"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("list_snapshots"))?;

    Ok(rows)
}

/// Summary of one snapshot, or `None` when it does not exist.
pub fn fetch_summary(conn: &Connection, snapshot_id: SnapshotId) -> Result<Option<SnapshotSummary>> {
    conn.query_row(
        "SELECT s.id, s.created_at, s.source_root,
                COUNT(e.relative_path), COALESCE(SUM(b.size), 0)
         FROM snapshots s
         LEFT JOIN snapshot_entries e ON e.snapshot_id = s.id
         LEFT JOIN blobs b ON b.digest = e.digest
         WHERE s.id = ?1
         GROUP BY s.id",
        [snapshot_id],
        summary_from_row,
    )
    .optional()
    .map_err(sqlite_op("fetch_summary"))
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotSummary> {
    Ok(SnapshotSummary {
        id: row.get(0)?,
        created_at: timestamp_from_millis(row.get(1)?),
        source_root: row.get(2)?,
        entry_count: row.get::<_, i64>(3)? as u64,
        total_bytes: row.get::<_, i64>(4)? as u64,
    })
}

/// All entries of one snapshot, ordered by relative path.
///
/// An unknown snapshot id yields an empty list; use `fetch_snapshot` to tell
/// "missing" apart from "empty".
pub fn list_entries(conn: &Connection, snapshot_id: SnapshotId) -> Result<Vec<SnapshotEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT relative_path, digest FROM snapshot_entries
             WHERE snapshot_id = ?1
             ORDER BY relative_path ASC",
        )
        .map_err(sqlite_op("list_entries"))?;

    let rows = stmt
        .query_map([snapshot_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(sqlite_op("list_entries"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("list_entries"))?;

    rows.into_iter()
        .map(|(relative_path, digest)| {
            Ok(SnapshotEntry {
                snapshot_id,
                relative_path,
                digest: ContentDigest::parse(&digest)?,
            })
        })
        .collect()
}

/// Entries whose digest has no stored blob.
///
/// The foreign key keeps this empty on a healthy store; a non-empty result
/// means the database was modified outside the store.
pub fn dangling_entries(conn: &Connection) -> Result<Vec<SnapshotEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.snapshot_id, e.relative_path, e.digest
             FROM snapshot_entries e
             WHERE NOT EXISTS (SELECT 1 FROM blobs b WHERE b.digest = e.digest)
             ORDER BY e.snapshot_id, e.relative_path",
        )
        .map_err(sqlite_op("dangling_entries"))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(sqlite_op("dangling_entries"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("dangling_entries"))?;

    rows.into_iter()
        .map(|(snapshot_id, relative_path, digest)| {
            Ok(SnapshotEntry {
                snapshot_id,
                relative_path,
                digest: ContentDigest::parse(&digest)?,
            })
        })
        .collect()
}

/// Count snapshots, entries and blobs.
pub fn store_stats(conn: &Connection) -> Result<StoreStats> {
    conn.query_row(
        "SELECT (SELECT COUNT(*) FROM snapshots),
                (SELECT COUNT(*) FROM snapshot_entries),
                (SELECT COUNT(*) FROM blobs),
                (SELECT COALESCE(SUM(size), 0) FROM blobs)",
        [],
        |row| {
            Ok(StoreStats {
                snapshots: row.get::<_, i64>(0)? as u64,
                entries: row.get::<_, i64>(1)? as u64,
                blobs: row.get::<_, i64>(2)? as u64,
                blob_bytes: row.get::<_, i64>(3)? as u64,
            })
        },
    )
    .map_err(sqlite_op("store_stats"))
}
