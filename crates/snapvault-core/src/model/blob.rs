use crate::digest::ContentDigest;
use serde::Serialize;

/// Reference to a stored blob, returned by `put_if_absent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRef {
    pub digest: ContentDigest,
    /// Content length in bytes
    pub size: u64,
    /// Whether this call performed the write (false when the blob already existed)
    pub inserted: bool,
}
