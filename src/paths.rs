//! Path normalization for archive members
//!
//! Two responsibilities:
//!
//! 1. [`anchor_of`] computes the tightest common ancestor directory ("anchor")
//!    of a sorted set of absolute file paths.
//! 2. [`archive_name`] turns an absolute path into the portable, relative,
//!    forward-slash name it is stored under inside an archive.
//!
//! ```rust
//! use savevault::paths::{anchor_of, archive_name};
//! use std::path::{Path, PathBuf};
//!
//! let files = [PathBuf::from("/a/b/c.txt"), PathBuf::from("/a/d/e.txt")];
//! let anchor = anchor_of(&files);
//! assert_eq!(anchor, PathBuf::from("/a"));
//! assert_eq!(archive_name(&files[0], &anchor).unwrap(), "b/c.txt");
//! ```

use crate::error::{Result, VaultError};
use std::path::{Component, Path, PathBuf, Prefix};

/// Compute the tightest common ancestor directory of `paths`
///
/// Starts from the first path's parent and walks it up until every following
/// path lies beneath it. Prefix checks are component-wise, so `/a/b` is never
/// considered an ancestor of `/a/bc/x`.
///
/// - a single path yields its containing directory
/// - an empty input yields an empty path
/// - paths with no shared root (e.g. different Windows drives) yield an empty path
pub fn anchor_of<P: AsRef<Path>>(paths: &[P]) -> PathBuf {
    let mut iter = paths.iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };

    let mut anchor = parent_or_empty(first.as_ref());
    for path in iter {
        while !anchor.as_os_str().is_empty() && !path.as_ref().starts_with(&anchor) {
            anchor = parent_or_empty(&anchor);
        }
        if anchor.as_os_str().is_empty() {
            break;
        }
    }
    anchor
}

fn parent_or_empty(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Derive the in-archive name of `path` relative to `anchor`
///
/// The anchor prefix is stripped and the remaining components are joined
/// with `/`. A Windows drive prefix such as `C:` contributes its letter only.
/// Root and `.` components are dropped. Colons and backslashes inside a Unix
/// file name are ordinary characters and are kept as they are.
///
/// # Errors
///
/// - [`VaultError::PathConversion`] if the path is not valid UTF-8
/// - [`VaultError::EmptyArchiveEntryName`] if nothing is left after normalization
pub fn archive_name(path: &Path, anchor: &Path) -> Result<String> {
    let relative = if anchor.as_os_str().is_empty() {
        path
    } else {
        path.strip_prefix(anchor).unwrap_or(path)
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Prefix(prefix) => match prefix.kind() {
                Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
                    parts.push(char::from(letter).to_string());
                }
                _ => {}
            },
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| VaultError::PathConversion(path.as_os_str().to_os_string()))?;
                parts.push(part.to_string());
            }
            Component::ParentDir => parts.push("..".to_string()),
            Component::RootDir | Component::CurDir => {}
        }
    }

    if parts.is_empty() {
        return Err(VaultError::EmptyArchiveEntryName(path.to_path_buf()));
    }
    Ok(parts.join("/"))
}
