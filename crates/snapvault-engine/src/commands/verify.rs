//! Store integrity verification.
//!
//! Re-reads every blob, checking its content against its digest and recorded
//! size, and looks for entries whose blob is absent. Rows keyed by something
//! that is not a digest are reported as corrupt rather than failing the run.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;
use snapvault_core::digest::ContentDigest;
use snapvault_core::errors::ExError;
use snapvault_core::model::SnapshotEntry;
use snapvault_core::{log_op_end, log_op_error, log_op_start};
use snapvault_store::blobs::BlobStore;
use snapvault_store::catalog::dangling_entries;
use snapvault_store::db::begin_read;
use snapvault_store::errors::Result;
use std::time::Instant;

/// A blob whose stored content or key fails its integrity check
#[derive(Debug, Clone)]
pub struct CorruptBlob {
    /// The row's key as stored (not necessarily a well-formed digest)
    pub digest: String,
    pub error: ExError,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub blobs_checked: usize,
    pub corrupt_blobs: Vec<CorruptBlob>,
    pub dangling_entries: Vec<SnapshotEntry>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.corrupt_blobs.is_empty() && self.dangling_entries.is_empty()
    }
}

/// Check every blob and entry in one consistent read.
pub fn verify_store(conn: &mut Connection) -> Result<VerifyReport> {
    log_op_start!("verify_store");
    let start = Instant::now();

    let report = verify_store_impl(conn).map_err(|e| {
        log_op_error!(
            "verify_store",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "verify_store",
        duration_ms = start.elapsed().as_millis() as u64,
        blobs_checked = report.blobs_checked,
        corrupt_blobs = report.corrupt_blobs.len(),
        dangling_entries = report.dangling_entries.len()
    );

    Ok(report)
}

fn verify_store_impl(conn: &mut Connection) -> Result<VerifyReport> {
    let tx = begin_read(conn)?;
    let mut report = VerifyReport::default();

    for stat in BlobStore::list(&tx)? {
        report.blobs_checked += 1;
        match BlobStore::get(&tx, &stat.digest) {
            Ok(_) => {}
            Err(error) if error.is_integrity() => {
                tracing::warn!(digest = %stat.digest, code = error.code(), "Corrupt blob");
                report.corrupt_blobs.push(CorruptBlob {
                    digest: stat.digest.to_string(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    for key in BlobStore::list_malformed(&tx)? {
        report.blobs_checked += 1;
        let Err(error) = ContentDigest::parse(&key) else {
            continue;
        };
        let error = error.with_op("verify_store");
        tracing::warn!(digest = %key, code = error.code(), "Malformed blob key");
        report.corrupt_blobs.push(CorruptBlob { digest: key, error });
    }

    report.dangling_entries = dangling_entries(&tx)?;
    Ok(report)
}
