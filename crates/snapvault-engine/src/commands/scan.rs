//! Directory traversal for snapshot creation.
//!
//! Walks a root directory without following symbolic links, digests every
//! regular file and classifies everything else as skipped. Files are hashed
//! as a stream and their content is not retained. Runs outside any
//! transaction.

#![allow(clippy::result_large_err)]

use crate::commands::snapshot::SnapshotOptions;
use snapvault_core::digest::ContentDigest;
use snapvault_core::errors::{io_error, ExError, ExErrorKind, VaultError};
use snapvault_core::paths::relative_path_string;
use snapvault_store::errors::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Why a filesystem entry was left out of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Symbolic links are never followed and never stored
    Symlink,
    /// FIFOs, sockets and device nodes
    SpecialFile,
    /// Name is not valid UTF-8, so it has no catalog path
    NonUtf8Path,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Symlink => "symlink",
            SkipReason::SpecialFile => "special file",
            SkipReason::NonUtf8Path => "non-UTF-8 path",
        }
    }
}

/// A filesystem entry that was deliberately not captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A file that could not be captured: unreadable, or too large for a blob
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ExError,
}

/// A regular file that was digested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// `/`-separated path relative to the scan root
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub digest: ContentDigest,
    pub size: u64,
}

/// Everything one traversal found
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Files in traversal order (sorted by name at every level)
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedPath>,
    pub failures: Vec<FileFailure>,
}

/// Whether a capture error concerns one file rather than the whole snapshot
pub(crate) fn is_per_file(error: &ExError) -> bool {
    matches!(error.kind(), ExErrorKind::Io | ExErrorKind::InvalidInput)
}

/// Error for a file whose content exceeds `limit`
pub(crate) fn too_large(path: &Path, size: u64, limit: u64) -> ExError {
    ExError::from(VaultError::BlobTooLarge { size, limit })
        .with_op("scan_directory")
        .with_path(path)
}

/// Walk `root` and digest every regular file below it
///
/// ## Errors
///
/// - `InvalidInput`: `root` is missing or not a directory, or a file exceeds
///   `max_file_bytes` and `strict` is set
/// - `Io`: a file or directory could not be read and `strict` is set
pub fn scan_directory(root: &Path, options: SnapshotOptions) -> Result<ScanResult> {
    ensure_directory(root)?;

    let mut result = ScanResult::default();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                let error = match err.into_io_error() {
                    Some(io) => io_error("scan_directory", &path, io),
                    None => ExError::new(ExErrorKind::Io)
                        .with_op("scan_directory")
                        .with_path(&path)
                        .with_message("filesystem loop detected"),
                };
                if options.strict {
                    return Err(error);
                }
                tracing::warn!(path = %path.display(), "Unreadable directory entry");
                result.failures.push(FileFailure { path, error });
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let reason = if file_type.is_symlink() {
            Some(SkipReason::Symlink)
        } else if !file_type.is_file() {
            Some(SkipReason::SpecialFile)
        } else {
            None
        };
        if let Some(reason) = reason {
            tracing::debug!(path = %entry.path().display(), reason = reason.as_str(), "Skipped");
            result.skipped.push(SkippedPath {
                path: entry.path().to_path_buf(),
                reason,
            });
            continue;
        }

        let Some(relative_path) = relative_path_string(root, entry.path()) else {
            result.skipped.push(SkippedPath {
                path: entry.path().to_path_buf(),
                reason: SkipReason::NonUtf8Path,
            });
            continue;
        };

        match digest_file(entry.path(), options.max_file_bytes) {
            Ok((digest, size)) => result.files.push(ScannedFile {
                relative_path,
                absolute_path: entry.path().to_path_buf(),
                digest,
                size,
            }),
            Err(error) => {
                if options.strict {
                    return Err(error);
                }
                tracing::warn!(
                    path = %entry.path().display(),
                    code = error.code(),
                    "File not captured"
                );
                result.failures.push(FileFailure {
                    path: entry.path().to_path_buf(),
                    error,
                });
            }
        }
    }

    Ok(result)
}

fn digest_file(path: &Path, max_file_bytes: u64) -> Result<(ContentDigest, u64)> {
    let file = fs::File::open(path).map_err(|e| io_error("scan_directory", path, e))?;
    let len = file
        .metadata()
        .map_err(|e| io_error("scan_directory", path, e))?
        .len();
    if len > max_file_bytes {
        return Err(too_large(path, len, max_file_bytes));
    }
    let (digest, size) =
        ContentDigest::of_reader(file).map_err(|e| io_error("scan_directory", path, e))?;
    if size > max_file_bytes {
        return Err(too_large(path, size, max_file_bytes));
    }
    Ok((digest, size))
}

fn ensure_directory(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(VaultError::NotADirectory {
            path: root.to_path_buf(),
        }
        .into()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(VaultError::NotADirectory {
                path: root.to_path_buf(),
            }
            .into())
        }
        Err(err) => Err(io_error("scan_directory", root, err)),
    }
}
