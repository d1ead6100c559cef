//! Read-only catalog queries: listing, snapshot detail and statistics.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;
use snapvault_core::model::{SnapshotEntry, SnapshotId, SnapshotSummary};
use snapvault_core::{log_op_end, log_op_error, log_op_start};
use snapvault_store::catalog::{self, StoreStats};
use snapvault_store::db::begin_read;
use snapvault_store::errors::Result;
use std::time::Instant;

/// One snapshot with its entries ordered by path
#[derive(Debug, Clone)]
pub struct SnapshotDetail {
    pub summary: SnapshotSummary,
    pub entries: Vec<SnapshotEntry>,
}

/// All snapshots in ascending id order.
pub fn list_snapshots(conn: &Connection) -> Result<Vec<SnapshotSummary>> {
    log_op_start!("list_snapshots");
    let start = Instant::now();

    let snapshots = catalog::list_snapshots(conn).map_err(|e| {
        log_op_error!(
            "list_snapshots",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "list_snapshots",
        duration_ms = start.elapsed().as_millis() as u64,
        count = snapshots.len()
    );

    Ok(snapshots)
}

/// Summary and entries of one snapshot, or `None` when it does not exist.
///
/// Both are read in one transaction.
pub fn show_snapshot(
    conn: &mut Connection,
    snapshot_id: SnapshotId,
) -> Result<Option<SnapshotDetail>> {
    log_op_start!("show_snapshot", snapshot_id = snapshot_id);
    let start = Instant::now();

    let detail = show_snapshot_impl(conn, snapshot_id).map_err(|e| {
        log_op_error!(
            "show_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            snapshot_id = snapshot_id
        );
        e
    })?;

    log_op_end!(
        "show_snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        snapshot_id = snapshot_id,
        found = detail.is_some()
    );

    Ok(detail)
}

fn show_snapshot_impl(
    conn: &mut Connection,
    snapshot_id: SnapshotId,
) -> Result<Option<SnapshotDetail>> {
    let tx = begin_read(conn)?;
    let Some(summary) = catalog::fetch_summary(&tx, snapshot_id)? else {
        return Ok(None);
    };
    let entries = catalog::list_entries(&tx, snapshot_id)?;
    Ok(Some(SnapshotDetail { summary, entries }))
}

/// Counts of snapshots, entries and blobs.
pub fn store_stats(conn: &Connection) -> Result<StoreStats> {
    log_op_start!("store_stats");
    let start = Instant::now();

    let stats = catalog::store_stats(conn).map_err(|e| {
        log_op_error!(
            "store_stats",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "store_stats",
        duration_ms = start.elapsed().as_millis() as u64,
        snapshots = stats.snapshots,
        blobs = stats.blobs
    );

    Ok(stats)
}
