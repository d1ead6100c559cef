//! Snapshot catalog mutations.
//!
//! `insert_snapshot` and `insert_entry` are meant to run inside a write
//! transaction owned by the caller; `detach_snapshot` owns its transaction.

use crate::catalog::query::fetch_snapshot;
use crate::db::begin_write;
use crate::errors::{sqlite_op, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use snapvault_core::digest::ContentDigest;
use snapvault_core::model::{timestamp_from_millis, SnapshotId, SnapshotRecord};

/// A snapshot that has been removed from the catalog.
#[derive(Debug, Clone)]
pub struct DetachedSnapshot {
    pub record: SnapshotRecord,
    /// Number of entry rows removed
    pub entries_removed: usize,
    /// Distinct digests the removed entries referenced
    pub digests: Vec<ContentDigest>,
}

/// Create a snapshot row and return it with its assigned id.
///
/// Ids come from `AUTOINCREMENT`, so they increase monotonically and are
/// never reused, even after the highest snapshot is pruned.
///
/// `created_at` is truncated to the catalog's millisecond precision; the
/// returned record carries the truncated value, identical to what later
/// queries read back.
pub fn insert_snapshot(
    conn: &Connection,
    created_at: DateTime<Utc>,
    source_root: Option<&str>,
) -> Result<SnapshotRecord> {
    let millis = created_at.timestamp_millis();
    let created_at = timestamp_from_millis(millis);

    conn.execute(
        "INSERT INTO snapshots (created_at, source_root) VALUES (?1, ?2)",
        rusqlite::params![millis, source_root],
    )
    .map_err(sqlite_op("insert_snapshot"))?;

    let id = conn.last_insert_rowid();

    tracing::debug!(snapshot_id = id, "Created snapshot catalog row");

    Ok(SnapshotRecord {
        id,
        created_at,
        source_root: source_root.map(str::to_string),
    })
}

/// Link one relative path of a snapshot to a stored blob.
///
/// The blob must already exist (foreign key), and `relative_path` must be
/// unique within the snapshot.
pub fn insert_entry(
    conn: &Connection,
    snapshot_id: SnapshotId,
    relative_path: &str,
    digest: &ContentDigest,
) -> Result<()> {
    conn.execute(
        "INSERT INTO snapshot_entries (snapshot_id, relative_path, digest) VALUES (?1, ?2, ?3)",
        rusqlite::params![snapshot_id, relative_path, digest.as_str()],
    )
    .map_err(|e| {
        sqlite_op("insert_entry")(e)
            .with_entity_id(snapshot_id.to_string())
            .with_path(relative_path)
    })?;
    Ok(())
}

/// Remove a snapshot and all of its entries in one write transaction.
///
/// Returns `None` (and changes nothing) when the snapshot does not exist.
/// After commit no live snapshot references digests that only this snapshot
/// used; those blobs become candidates for reclamation.
pub fn detach_snapshot(
    conn: &mut Connection,
    snapshot_id: SnapshotId,
) -> Result<Option<DetachedSnapshot>> {
    let tx = begin_write(conn)?;

    let record = match fetch_snapshot(&tx, snapshot_id)? {
        Some(record) => record,
        None => return Ok(None),
    };

    let digests = {
        let mut stmt = tx
            .prepare(
                "SELECT DISTINCT digest FROM snapshot_entries
                 WHERE snapshot_id = ?1 ORDER BY digest",
            )
            .map_err(sqlite_op("detach_snapshot"))?;
        let raw = stmt
            .query_map([snapshot_id], |row| row.get::<_, String>(0))
            .map_err(sqlite_op("detach_snapshot"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("detach_snapshot"))?;
        raw.iter()
            .map(|d| ContentDigest::parse(d))
            .collect::<Result<Vec<_>>>()?
    };

    let entries_removed = tx
        .execute(
            "DELETE FROM snapshot_entries WHERE snapshot_id = ?1",
            [snapshot_id],
        )
        .map_err(sqlite_op("detach_snapshot"))?;

    tx.execute("DELETE FROM snapshots WHERE id = ?1", [snapshot_id])
        .map_err(sqlite_op("detach_snapshot"))?;

    tx.commit().map_err(sqlite_op("detach_snapshot"))?;

    tracing::debug!(
        snapshot_id = snapshot_id,
        entries_removed = entries_removed,
        digests = digests.len(),
        "Detached snapshot"
    );

    Ok(Some(DetachedSnapshot {
        record,
        entries_removed,
        digests,
    }))
}
