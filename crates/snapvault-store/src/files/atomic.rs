//! Atomic write primitives
//!
//! Uses temp→rename pattern to ensure no partial writes: a reader of the
//! target sees either the previous file or the complete new one.

use crate::errors::Result;
use snapvault_core::errors::{io_error, ExError, ExErrorKind};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Suffix of in-flight temp files
pub const TEMP_SUFFIX: &str = ".snapvault-tmp";

/// Atomically write bytes to a file, replacing any existing file
///
/// Creates missing parent directories. The temp file lives next to the
/// target so the final rename never crosses filesystems, and its name is
/// unique per call, so concurrent writers of one target never share it.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    let parent = target_path.parent().ok_or_else(|| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("atomic_write")
            .with_path(target_path)
            .with_message("target has no parent directory")
    })?;
    fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", parent, e))?;

    let prefix = format!(
        ".{}.",
        target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    // Dropping the temp file on any error path removes it
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| io_error("create_temp", parent, e))?;

    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| io_error("write_temp", temp.path(), e))?;

    temp.persist(target_path)
        .map_err(|e| io_error("rename_temp", target_path, e.error))?;

    Ok(())
}
