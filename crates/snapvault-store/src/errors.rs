//! Error handling for snapvault-store
//!
//! Wraps snapvault-core ExError with store-specific helpers

use rusqlite::ErrorCode;
use snapvault_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migration")
        .with_entity_id(migration_id)
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migration_checksum")
        .with_entity_id(migration_id)
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create an error for a database that cannot be opened or configured
pub fn store_unavailable(path: &Path, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::StoreUnavailable)
        .with_op("open_store")
        .with_path(path)
        .with_message(format!("Backing store unavailable: {}", reason))
}

/// Create a database error from rusqlite::Error
///
/// Lock contention that outlived the busy timeout becomes `Timeout`; files
/// that are not databases or cannot be opened become `StoreUnavailable`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::Timeout,
            ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::PermissionDenied => {
                ExErrorKind::StoreUnavailable
            }
            _ => ExErrorKind::Persistence,
        },
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Like `from_rusqlite`, tagging the operation that failed
pub fn sqlite_op(op: &'static str) -> impl Fn(rusqlite::Error) -> ExError {
    move |err| from_rusqlite(err).with_op(op)
}
