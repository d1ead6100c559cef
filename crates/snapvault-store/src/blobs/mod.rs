//! Content-Addressable blob storage
//!
//! Provides:
//! - Atomic insert-if-absent keyed by content digest (the deduplication layer)
//! - Integrity-checked reads
//! - Reference-checked deletion for the pruner

mod store;

pub use store::{BlobStat, BlobStore, MAX_BLOB_BYTES};
