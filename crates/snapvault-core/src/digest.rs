//! Content digest computation.
//!
//! A digest is the SHA256 of a file's bytes, hex-encoded (64 lowercase
//! characters). It is both the blob store key and the integrity check applied
//! when content is read back.
//!
//! ## Determinism Guarantees
//!
//! - Same bytes → same digest, independent of path or modification time
//! - Any byte difference → different digest (collision-resistant hash)

use crate::errors::{Result, VaultError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;

/// Length of a hex-encoded SHA256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Fixed-length content identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of a byte sequence.
    ///
    /// ## Example
    ///
    /// ```
    /// use snapvault_core::digest::ContentDigest;
    ///
    /// let a = ContentDigest::of(b"hello world");
    /// let b = ContentDigest::of(b"hello world");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    /// Digest everything `reader` yields, returning the digest and byte count.
    ///
    /// Content is hashed in fixed-size chunks and never held in memory as a
    /// whole.
    pub fn of_reader<R: Read>(mut reader: R) -> std::io::Result<(Self, u64)> {
        let mut hasher = Sha256::new();
        let size = std::io::copy(&mut reader, &mut hasher)?;
        Ok((Self(hex::encode(hasher.finalize())), size))
    }

    /// Parse a digest read from the catalog or supplied by a caller.
    ///
    /// ## Errors
    ///
    /// `InvalidInput` unless the value is exactly 64 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self> {
        let well_formed = value.len() == DIGEST_HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(VaultError::InvalidDigest {
                value: value.to_string(),
            }
            .into());
        }
        Ok(Self(value.to_string()))
    }

    /// Check that `content` hashes to this digest.
    ///
    /// ## Errors
    ///
    /// `DigestMismatch` when the recomputed digest differs.
    pub fn verify(&self, content: &[u8]) -> Result<()> {
        let actual = Self::of(content);
        if actual != *self {
            return Err(VaultError::DigestMismatch {
                expected: self.0.clone(),
                actual: actual.0,
            }
            .into());
        }
        Ok(())
    }

    /// Hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for human-facing output
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
