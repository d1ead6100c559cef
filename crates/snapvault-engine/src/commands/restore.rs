//! Snapshot restore.
//!
//! Restore is additive: every entry is written under the output directory,
//! replacing a file already at that path, and nothing else there is touched.
//! Catalog reads happen inside one read transaction, so a concurrent prune
//! either happened entirely before the restore or not at all from its view.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;
use snapvault_core::errors::{io_error, ExError, ExErrorKind};
use snapvault_core::model::{SnapshotEntry, SnapshotId};
use snapvault_core::paths::resolve_under;
use snapvault_core::{log_op_end, log_op_error, log_op_start};
use snapvault_store::blobs::BlobStore;
use snapvault_store::catalog::{fetch_snapshot, list_entries};
use snapvault_store::db::begin_read;
use snapvault_store::errors::Result;
use snapvault_store::files::atomic_write;
use std::path::Path;
use std::time::Instant;

/// Options for snapshot restore.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Stop at the first missing/corrupt blob or unsafe path instead of
    /// recording it and restoring the remaining entries.
    pub abort_on_integrity_error: bool,
}

/// An entry that could not be restored
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub relative_path: String,
    pub error: ExError,
}

/// Files written by a restore
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub snapshot_id: SnapshotId,
    pub restored: usize,
    pub bytes_written: u64,
    pub failures: Vec<EntryFailure>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a restore request
#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    /// The id is not in the catalog (pruned or never created); nothing was written
    NotFound { snapshot_id: SnapshotId },
    Restored(RestoreReport),
}

impl RestoreOutcome {
    /// Number of files written (zero for `NotFound`)
    pub fn restored(&self) -> usize {
        match self {
            RestoreOutcome::NotFound { .. } => 0,
            RestoreOutcome::Restored(report) => report.restored,
        }
    }
}

/// Recreate the files of snapshot `snapshot_id` under `output_directory`.
///
/// ## Errors
///
/// - `Io`: the output directory cannot be created
/// - `MissingBlob` / `DigestMismatch` / `InvalidPath`: only with
///   `abort_on_integrity_error`; otherwise recorded in the report
/// - `Persistence` / `Timeout`: database failure
pub fn restore_snapshot(
    conn: &mut Connection,
    snapshot_id: SnapshotId,
    output_directory: &Path,
    options: RestoreOptions,
) -> Result<RestoreOutcome> {
    log_op_start!(
        "restore_snapshot",
        snapshot_id = snapshot_id,
        output = %output_directory.display()
    );
    let start = Instant::now();

    let outcome = restore_snapshot_impl(conn, snapshot_id, output_directory, options).map_err(
        |e| {
            log_op_error!(
                "restore_snapshot",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot_id
            );
            e
        },
    )?;

    match &outcome {
        RestoreOutcome::NotFound { .. } => {
            log_op_end!(
                "restore_snapshot",
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot_id,
                found = false
            );
        }
        RestoreOutcome::Restored(report) => {
            log_op_end!(
                "restore_snapshot",
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot_id,
                found = true,
                restored = report.restored,
                failures = report.failures.len()
            );
        }
    }

    Ok(outcome)
}

fn restore_snapshot_impl(
    conn: &mut Connection,
    snapshot_id: SnapshotId,
    output_directory: &Path,
    options: RestoreOptions,
) -> Result<RestoreOutcome> {
    let tx = begin_read(conn)?;

    if fetch_snapshot(&tx, snapshot_id)?.is_none() {
        return Ok(RestoreOutcome::NotFound { snapshot_id });
    }
    let entries = list_entries(&tx, snapshot_id)?;

    std::fs::create_dir_all(output_directory)
        .map_err(|e| io_error("restore_snapshot", output_directory, e))?;

    let mut report = RestoreReport {
        snapshot_id,
        ..RestoreReport::default()
    };

    for entry in &entries {
        match restore_entry(&tx, output_directory, entry) {
            Ok(bytes) => {
                report.restored += 1;
                report.bytes_written += bytes;
            }
            Err(error) if is_per_entry(&error, options) => {
                tracing::warn!(
                    path = %entry.relative_path,
                    code = error.code(),
                    "Entry not restored"
                );
                report.failures.push(EntryFailure {
                    relative_path: entry.relative_path.clone(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(RestoreOutcome::Restored(report))
}

/// Whether a failed entry is recorded and skipped rather than aborting
fn is_per_entry(error: &ExError, options: RestoreOptions) -> bool {
    match error.kind() {
        ExErrorKind::Io => true,
        _ if error.is_integrity() => !options.abort_on_integrity_error,
        _ => false,
    }
}

fn restore_entry(
    conn: &Connection,
    output_directory: &Path,
    entry: &SnapshotEntry,
) -> Result<u64> {
    let target = resolve_under(output_directory, &entry.relative_path)
        .map_err(|e| e.with_op("restore_snapshot"))?;
    let content = BlobStore::get(conn, &entry.digest)
        .map_err(|e| e.with_op("restore_snapshot").with_path(&entry.relative_path))?;
    atomic_write(&target, &content)?;
    Ok(content.len() as u64)
}
