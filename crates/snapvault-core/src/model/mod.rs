//! Domain model for the snapshot store.

pub mod blob;
pub mod snapshot;

pub use blob::BlobRef;
pub use snapshot::{
    timestamp_from_millis, SnapshotEntry, SnapshotId, SnapshotRecord, SnapshotSummary,
};
