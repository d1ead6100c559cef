//! snapvault core - content digest, domain model and the error and logging
//! facilities shared by every other crate.
//!
//! - `digest`: SHA256 content identifiers used as blob keys
//! - `model`: blobs, snapshots and snapshot entries
//! - `paths`: platform-independent relative paths
//! - `errors`: canonical `ExError` plus the domain `VaultError`
//! - `logging_facility`: tracing initialization and boundary macros

pub mod digest;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod paths;

pub use snapvault_core_types::schema;

// Re-export commonly used types
pub use digest::ContentDigest;
pub use errors::{ExError, ExErrorKind, Result, VaultError};
pub use model::{BlobRef, SnapshotEntry, SnapshotId, SnapshotRecord, SnapshotSummary};
