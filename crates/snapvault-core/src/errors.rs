use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using the canonical error
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by snapvault maps onto one of these kinds. Each kind
/// has a stable code that callers (and the CLI) can match on without parsing
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Usage
    InvalidInput,

    // Catalog
    NotFound,

    // Integrity
    /// A catalog entry references a digest with no stored blob
    MissingBlob,
    /// Stored content does not hash to its recorded digest, or its size disagrees
    DigestMismatch,
    /// A catalog path would resolve outside the restore destination
    InvalidPath,

    // Integration/IO
    Io,
    Persistence,
    Migration,
    /// The backing store cannot be opened or configured
    StoreUnavailable,
    /// The backing store stayed locked past the configured busy timeout
    Timeout,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            ExErrorKind::DigestMismatch => "ERR_DIGEST_MISMATCH",
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Migration => "ERR_MIGRATION",
            ExErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds that indicate storage corruption
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ExErrorKind::MissingBlob | ExErrorKind::DigestMismatch | ExErrorKind::InvalidPath
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling and optional
/// context (operation, entity, filesystem path) for humans.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    path: Option<PathBuf>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (snapshot id or digest)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add filesystem path context
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Shorthand for `self.kind().is_integrity()`
    pub fn is_integrity(&self) -> bool {
        self.kind.is_integrity()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain-level failures raised by the core and store layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    /// Snapshot id is not in the catalog
    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: i64 },

    /// A digest string is not 64 lowercase hex characters
    #[error("Invalid digest: {value}")]
    InvalidDigest { value: String },

    /// Catalog references a digest that has no blob
    #[error("Blob not found for digest {digest}")]
    MissingBlob { digest: String },

    /// Content hashes to something other than the digest it is filed under
    #[error("Digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Stored size column disagrees with the stored content length
    #[error("Size mismatch for blob {digest}: recorded {recorded}, actual {actual}")]
    SizeMismatch {
        digest: String,
        recorded: i64,
        actual: i64,
    },

    /// Relative path is empty, absolute, or climbs out of its root
    #[error("Unsafe relative path: {path}")]
    UnsafePath { path: String },

    /// Content exceeds what a single blob may hold
    #[error("Content of {size} bytes exceeds the blob limit of {limit} bytes")]
    BlobTooLarge { size: u64, limit: u64 },

    /// Snapshot root is missing or not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Conversion from VaultError to ExError
impl From<VaultError> for ExError {
    fn from(err: VaultError) -> Self {
        let message = err.to_string();
        match err {
            VaultError::SnapshotNotFound { snapshot_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(snapshot_id.to_string())
                .with_message(message),

            VaultError::InvalidDigest { value } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity_id(value)
                .with_message(message),

            VaultError::MissingBlob { digest } => ExError::new(ExErrorKind::MissingBlob)
                .with_entity_id(digest)
                .with_message(message),

            VaultError::DigestMismatch { expected, .. } => {
                ExError::new(ExErrorKind::DigestMismatch)
                    .with_entity_id(expected)
                    .with_message(message)
            }

            VaultError::SizeMismatch { digest, .. } => ExError::new(ExErrorKind::DigestMismatch)
                .with_entity_id(digest)
                .with_message(message),

            VaultError::UnsafePath { path } => ExError::new(ExErrorKind::InvalidPath)
                .with_entity_id(path)
                .with_message(message),

            VaultError::BlobTooLarge { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            VaultError::NotADirectory { path } => ExError::new(ExErrorKind::InvalidInput)
                .with_path(path)
                .with_message(message),
        }
    }
}

/// Create an IO error carrying the offending path
pub fn io_error(op: &str, path: impl AsRef<Path>, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(op)
        .with_path(path)
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes_are_unique() {
        let kinds = [
            ExErrorKind::InvalidInput,
            ExErrorKind::NotFound,
            ExErrorKind::MissingBlob,
            ExErrorKind::DigestMismatch,
            ExErrorKind::InvalidPath,
            ExErrorKind::Io,
            ExErrorKind::Persistence,
            ExErrorKind::Migration,
            ExErrorKind::StoreUnavailable,
            ExErrorKind::Timeout,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_integrity_kinds() {
        assert!(ExErrorKind::MissingBlob.is_integrity());
        assert!(ExErrorKind::DigestMismatch.is_integrity());
        assert!(ExErrorKind::InvalidPath.is_integrity());
        assert!(!ExErrorKind::NotFound.is_integrity());
        assert!(!ExErrorKind::Io.is_integrity());
    }

    #[test]
    fn test_missing_blob_converts_to_integrity_error() {
        let err: ExError = VaultError::MissingBlob {
            digest: "ab".repeat(32),
        }
        .into();

        assert_eq!(err.kind(), ExErrorKind::MissingBlob);
        assert!(err.is_integrity());
        assert_eq!(err.entity_id(), Some("ab".repeat(32).as_str()));
    }

    #[test]
    fn test_snapshot_not_found_is_not_integrity() {
        let err: ExError = VaultError::SnapshotNotFound { snapshot_id: 7 }.into();

        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.code(), "ERR_NOT_FOUND");
        assert_eq!(err.entity_id(), Some("7"));
        assert!(!err.is_integrity());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::Io)
            .with_op("read_file")
            .with_path("/tmp/x")
            .with_message("permission denied");
        let rendered = err.to_string();

        assert!(rendered.starts_with("[ERR_IO]"));
        assert!(rendered.contains("read_file"));
        assert!(rendered.contains("/tmp/x"));
        assert!(rendered.contains("permission denied"));
    }
}
