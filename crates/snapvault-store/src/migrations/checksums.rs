//! Checksum validation for migrations
//!
//! A migration's SHA256 is recorded when it is applied so later edits to an
//! already-applied script are detected instead of silently skipped.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a migration script
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
