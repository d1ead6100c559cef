//! Relative path normalization.
//!
//! Catalog paths are always `/`-separated and relative to the captured root,
//! whatever the host platform. Restores resolve them back under a destination
//! directory and refuse anything that could land outside it.

use crate::errors::{Result, VaultError};
use std::path::{Component, Path, PathBuf};

/// Catalog separator, independent of the host platform.
pub const SEPARATOR: char = '/';

/// Derive the catalog path of `file` relative to `root`.
///
/// Returns `None` when `file` is not under `root`, when any component is not
/// valid UTF-8, or when the path contains anything but normal components.
pub fn relative_path_string(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolve a catalog path under `root`.
///
/// ## Errors
///
/// `InvalidPath` when the value is empty, absolute, or has an empty, `.` or
/// `..` segment.
pub fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf> {
    let unsafe_path = || VaultError::UnsafePath {
        path: relative.to_string(),
    };

    if relative.is_empty() || relative.starts_with(SEPARATOR) {
        return Err(unsafe_path().into());
    }

    let mut resolved = root.to_path_buf();
    for segment in relative.split(SEPARATOR) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(unsafe_path().into());
        }
        let segment_path = Path::new(segment);
        // Reject anything the host would interpret as a root or prefix
        if !matches!(
            segment_path.components().next(),
            Some(Component::Normal(_))
        ) || segment_path.components().count() != 1
        {
            return Err(unsafe_path().into());
        }
        resolved.push(segment);
    }
    Ok(resolved)
}
