//! Resolution of tracked paths into a concrete file set
//!
//! A profile tracks a set of absolute paths which may be files or directories.
//! At snapshot time [`FileSetResolver`] expands them into the files that
//! currently exist:
//!
//! - tracked paths that no longer exist are skipped silently
//! - tracked files are included as-is
//! - tracked directories are walked recursively, every file beneath them included
//! - directories themselves are never members
//!
//! The result is deduplicated and sorted, which gives archives a
//! deterministic member order and therefore a reproducible content digest.
//!
//! ```rust,no_run
//! use savevault::file_tracking::FileSetResolver;
//! use std::path::PathBuf;
//!
//! # fn example() -> savevault::Result<()> {
//! let resolver = FileSetResolver::new().with_follow_symlinks(false);
//! let files = resolver.resolve(&[PathBuf::from("/home/user/game/saves")])?;
//! println!("{} files to snapshot", files.len());
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Expands tracked paths into the sorted set of existing files beneath them
#[derive(Debug, Clone, Default)]
pub struct FileSetResolver {
    /// Whether directory walks follow symbolic links
    follow_symlinks: bool,
}

impl FileSetResolver {
    /// Create a resolver that does not follow directory symlinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether directory walks follow symbolic links
    ///
    /// When disabled (default), a symlink found inside a tracked directory is
    /// still included if it points at a regular file, but linked directories
    /// are not descended into.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Resolve `tracked` into a sorted, deduplicated list of file paths
    ///
    /// # Errors
    ///
    /// Any I/O error other than "not found" while statting a tracked path or
    /// walking a tracked directory aborts resolution:
    ///
    /// - [`VaultError::Io`](crate::VaultError::Io) from statting a tracked path
    /// - [`VaultError::WalkDir`](crate::VaultError::WalkDir) from walking a directory
    pub fn resolve<P: AsRef<Path>>(&self, tracked: &[P]) -> Result<Vec<PathBuf>> {
        let mut files = BTreeSet::new();

        for tracked_path in tracked {
            let path = tracked_path.as_ref();
            let metadata = match fs::metadata(path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Skipping missing tracked path {:?}", path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if metadata.is_dir() {
                self.walk_directory(path, &mut files)?;
            } else if metadata.is_file() {
                files.insert(path.to_path_buf());
            } else {
                debug!("Skipping tracked path {:?}: not a regular file", path);
            }
        }

        debug!("Resolved {} tracked paths into {} files", tracked.len(), files.len());
        Ok(files.into_iter().collect())
    }

    fn walk_directory(&self, dir: &Path, files: &mut BTreeSet<PathBuf>) -> Result<()> {
        for entry in WalkDir::new(dir).follow_links(self.follow_symlinks) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_not_found(e.io_error()) => {
                    trace!("Entry vanished during walk: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_file() {
                files.insert(entry.into_path());
            } else if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => {
                        files.insert(entry.into_path());
                    }
                    Ok(_) => trace!("Skipping symlink to non-file {:?}", entry.path()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        trace!("Skipping broken symlink {:?}", entry.path());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.map(|e| e.kind() == io::ErrorKind::NotFound).unwrap_or(false)
}
