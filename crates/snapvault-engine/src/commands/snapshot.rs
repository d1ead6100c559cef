//! Snapshot creation.
//!
//! ## Pipeline
//! 1. Scan the root directory (no write lock held): digest files as streams
//! 2. Open one `BEGIN IMMEDIATE` transaction
//! 3. Register the snapshot row; for each file whose blob is not stored,
//!    read it and insert the blob; then add its entry
//! 4. Commit; the snapshot becomes visible with all of its blobs at once
//!
//! Content is read one file at a time inside the transaction, so memory use
//! is bounded by the largest file, not the tree. Whether a blob is stored is
//! decided inside the transaction, so a blob reclaimed by a concurrent prune
//! after the scan is simply inserted again.

#![allow(clippy::result_large_err)]

use crate::commands::scan::{
    is_per_file, scan_directory, too_large, FileFailure, ScannedFile, SkippedPath,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use snapvault_core::digest::ContentDigest;
use snapvault_core::errors::io_error;
use snapvault_core::model::SnapshotId;
use snapvault_core::{log_op_end, log_op_error, log_op_start};
use snapvault_store::catalog::{insert_entry, insert_snapshot};
use snapvault_store::db::begin_write;
use snapvault_store::errors::{sqlite_op, Result};
use snapvault_store::blobs::{BlobStore, MAX_BLOB_BYTES};
use std::path::Path;
use std::time::Instant;

/// Options for snapshot creation.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions {
    /// Abort without registering anything on the first file that cannot be
    /// captured.
    pub strict: bool,
    /// Files larger than this are not captured (at most `MAX_BLOB_BYTES`).
    pub max_file_bytes: u64,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_file_bytes: MAX_BLOB_BYTES,
        }
    }
}

/// Result of a registered snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub snapshot_id: SnapshotId,
    pub created_at: DateTime<Utc>,
    /// Number of entries registered
    pub files: usize,
    /// Sum of the captured file sizes
    pub bytes: u64,
    /// Blobs this snapshot stored for the first time
    pub blobs_inserted: usize,
    /// Symlinks, special files and unrepresentable names
    pub skipped: Vec<SkippedPath>,
    /// Files that could not be read or were too large (the snapshot omits them)
    pub failures: Vec<FileFailure>,
}

impl SnapshotReport {
    /// True when every regular file under the root was captured
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Capture every regular file under `root_directory` as a new snapshot.
///
/// ## Errors
///
/// - `InvalidInput`: root is missing or not a directory
/// - `Io`: unreadable file with `strict` set
/// - `InvalidInput`: a file larger than `max_file_bytes` with `strict` set
/// - `Timeout`: the write lock could not be acquired within the busy timeout
/// - `Persistence`: database failure (nothing is registered)
pub fn create_snapshot(
    conn: &mut Connection,
    root_directory: &Path,
    options: SnapshotOptions,
) -> Result<SnapshotReport> {
    log_op_start!(
        "create_snapshot",
        root = %root_directory.display(),
        strict = options.strict
    );
    let start = Instant::now();

    let report = create_snapshot_impl(conn, root_directory, options).map_err(|e| {
        log_op_error!(
            "create_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "create_snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        snapshot_id = report.snapshot_id,
        entry_count = report.files,
        blobs_inserted = report.blobs_inserted,
        skipped = report.skipped.len(),
        failures = report.failures.len()
    );

    Ok(report)
}

fn create_snapshot_impl(
    conn: &mut Connection,
    root_directory: &Path,
    options: SnapshotOptions,
) -> Result<SnapshotReport> {
    let options = SnapshotOptions {
        max_file_bytes: options.max_file_bytes.min(MAX_BLOB_BYTES),
        ..options
    };
    let scan = scan_directory(root_directory, options)?;
    let mut failures = scan.failures;

    let source_root = root_directory
        .canonicalize()
        .unwrap_or_else(|_| root_directory.to_path_buf());
    let source_root = source_root.to_string_lossy();

    let tx = begin_write(conn)?;
    let record = insert_snapshot(&tx, Utc::now(), Some(source_root.as_ref()))?;

    let mut files = 0;
    let mut bytes = 0;
    let mut blobs_inserted = 0;

    for file in &scan.files {
        let stored = match store_file(&tx, file, options.max_file_bytes) {
            Ok(stored) => stored,
            Err(error) if options.strict || !is_per_file(&error) => return Err(error),
            Err(error) => {
                tracing::warn!(
                    path = %file.relative_path,
                    code = error.code(),
                    "File changed before capture"
                );
                failures.push(FileFailure {
                    path: file.absolute_path.clone(),
                    error,
                });
                continue;
            }
        };

        insert_entry(&tx, record.id, &file.relative_path, &stored.digest)?;
        files += 1;
        bytes += stored.size;
        if stored.inserted {
            blobs_inserted += 1;
        }
    }

    tx.commit().map_err(sqlite_op("create_snapshot"))?;

    Ok(SnapshotReport {
        snapshot_id: record.id,
        created_at: record.created_at,
        files,
        bytes,
        blobs_inserted,
        skipped: scan.skipped,
        failures,
    })
}

struct StoredFile {
    digest: ContentDigest,
    size: u64,
    inserted: bool,
}

/// Make sure the file's blob is present inside the current transaction.
///
/// A stored blob is reused without touching the file. Otherwise the file is
/// read now; if it changed since the scan, its current content is captured.
/// `Io` and oversize errors are per-file; anything else aborts the snapshot.
fn store_file(conn: &Connection, file: &ScannedFile, max_file_bytes: u64) -> Result<StoredFile> {
    if BlobStore::exists(conn, &file.digest)? {
        return Ok(StoredFile {
            digest: file.digest.clone(),
            size: file.size,
            inserted: false,
        });
    }

    let content = std::fs::read(&file.absolute_path)
        .map_err(|e| io_error("create_snapshot", &file.absolute_path, e))?;
    if content.len() as u64 > max_file_bytes {
        return Err(
            too_large(&file.absolute_path, content.len() as u64, max_file_bytes)
                .with_op("create_snapshot"),
        );
    }

    let digest = ContentDigest::of(&content);
    if digest != file.digest {
        tracing::debug!(
            path = %file.relative_path,
            digest = %digest,
            "File changed since scan; capturing current content"
        );
    }
    let blob = BlobStore::put_if_absent(conn, &digest, &content)?;
    Ok(StoredFile {
        digest: blob.digest,
        size: blob.size,
        inserted: blob.inserted,
    })
}
