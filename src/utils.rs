//! Utility functions for savevault
//!
//! Small helpers shared by the engine components:
//!
//! - atomic file writing (temp file in the target directory, then rename)
//! - cross-platform permission handling
//! - validation of profile/archive names used as single path components
//! - human-readable byte formatting

use crate::compression::FILE_MODE;
use crate::error::{Result, VaultError};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::trace;

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to `path`, so the final rename never
/// crosses a filesystem boundary. Either the complete content is visible at
/// `path` or the previous state is left untouched. The written file gets the
/// standard [`FILE_MODE`].
///
/// # Errors
///
/// - [`VaultError::Io`] if creating, writing, syncing or renaming the temp file fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".savevault-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    set_permissions(path, FILE_MODE)?;
    trace!("Atomically wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
///
/// Only the read-only attribute can be expressed; it is set when the owner
/// write bit is absent from `mode`.
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    let is_readonly = (mode & 0o200) == 0;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(is_readonly);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Check that `name` can be used as a single file or directory name
///
/// `kind` names the argument in error messages ("profile name", "archive name").
///
/// # Errors
///
/// - [`VaultError::Validation`] if `name` is empty
/// - [`VaultError::InvalidName`] if `name` is `.`/`..` or contains a separator or NUL
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::validation(format!("empty {}", kind)));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(VaultError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Modification time of `metadata` as a UTC timestamp
pub fn modified_utc(metadata: &fs::Metadata) -> Result<DateTime<Utc>> {
    Ok(metadata.modified()?.into())
}

/// Format bytes in human-readable form
///
/// ```rust,ignore
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
