//! Snapshot pruning and blob reclamation.
//!
//! Pruning is two write transactions:
//! 1. **Detach**: delete the snapshot and its entries, remembering the
//!    distinct digests they referenced
//! 2. **Reclaim**: delete each remembered blob that no entry references
//!
//! SQLite admits one writer at a time and snapshot creation stores blobs and
//! entries in a single write transaction. A creator that committed before
//! the reclaim holds a visible reference, so its blobs are kept; one that
//! commits after re-inserts any blob it needs. A crash between the two steps
//! leaves orphan blobs, never dangling entries; `sweep_unreferenced_blobs`
//! collects those.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;
use snapvault_core::digest::ContentDigest;
use snapvault_core::model::SnapshotId;
use snapvault_core::{log_op_end, log_op_error, log_op_start};
use snapvault_store::blobs::BlobStore;
use snapvault_store::catalog::detach_snapshot;
use snapvault_store::db::begin_write;
use snapvault_store::errors::{sqlite_op, Result};
use std::time::Instant;

/// Work done by a prune
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub snapshot_id: SnapshotId,
    pub entries_removed: usize,
    pub blobs_reclaimed: usize,
    pub bytes_reclaimed: u64,
}

/// Outcome of a prune request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    /// Nothing was changed
    NotFound { snapshot_id: SnapshotId },
    Pruned(PruneReport),
}

/// Orphan blobs removed by a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub blobs_reclaimed: usize,
    pub bytes_reclaimed: u64,
}

/// Remove snapshot `snapshot_id` and every blob only it referenced.
///
/// ## Errors
///
/// - `Timeout`: a competing writer held the lock past the busy timeout
/// - `Persistence`: database failure (a failed detach changes nothing)
pub fn prune_snapshot(conn: &mut Connection, snapshot_id: SnapshotId) -> Result<PruneOutcome> {
    log_op_start!("prune_snapshot", snapshot_id = snapshot_id);
    let start = Instant::now();

    let outcome = prune_snapshot_impl(conn, snapshot_id).map_err(|e| {
        log_op_error!(
            "prune_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            snapshot_id = snapshot_id
        );
        e
    })?;

    match &outcome {
        PruneOutcome::NotFound { .. } => {
            log_op_end!(
                "prune_snapshot",
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot_id,
                found = false
            );
        }
        PruneOutcome::Pruned(report) => {
            log_op_end!(
                "prune_snapshot",
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot_id,
                found = true,
                entries_removed = report.entries_removed,
                blobs_reclaimed = report.blobs_reclaimed
            );
        }
    }

    Ok(outcome)
}

fn prune_snapshot_impl(conn: &mut Connection, snapshot_id: SnapshotId) -> Result<PruneOutcome> {
    let Some(detached) = detach_snapshot(conn, snapshot_id)? else {
        return Ok(PruneOutcome::NotFound { snapshot_id });
    };

    let (blobs_reclaimed, bytes_reclaimed) = reclaim(conn, &detached.digests)?;

    Ok(PruneOutcome::Pruned(PruneReport {
        snapshot_id,
        entries_removed: detached.entries_removed,
        blobs_reclaimed,
        bytes_reclaimed,
    }))
}

/// Reclaim every stored blob that no snapshot entry references.
pub fn sweep_unreferenced_blobs(conn: &mut Connection) -> Result<SweepReport> {
    log_op_start!("sweep_unreferenced_blobs");
    let start = Instant::now();

    let report = sweep_impl(conn).map_err(|e| {
        log_op_error!(
            "sweep_unreferenced_blobs",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "sweep_unreferenced_blobs",
        duration_ms = start.elapsed().as_millis() as u64,
        blobs_reclaimed = report.blobs_reclaimed,
        bytes_reclaimed = report.bytes_reclaimed
    );

    Ok(report)
}

fn sweep_impl(conn: &mut Connection) -> Result<SweepReport> {
    let candidates = BlobStore::list_unreferenced(conn)?;
    let (blobs_reclaimed, bytes_reclaimed) = reclaim(conn, &candidates)?;
    Ok(SweepReport {
        blobs_reclaimed,
        bytes_reclaimed,
    })
}

/// Conditionally delete each candidate in one write transaction
fn reclaim(conn: &mut Connection, candidates: &[ContentDigest]) -> Result<(usize, u64)> {
    if candidates.is_empty() {
        return Ok((0, 0));
    }

    let tx = begin_write(conn)?;
    let mut blobs = 0;
    let mut bytes = 0;
    for digest in candidates {
        if let Some(size) = BlobStore::delete_if_unreferenced(&tx, digest)? {
            blobs += 1;
            bytes += size;
        }
    }
    tx.commit().map_err(sqlite_op("reclaim"))?;

    Ok((blobs, bytes))
}
