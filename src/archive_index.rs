//! Archive listing and management for one profile
//!
//! The index is derived, never stored: every call reads the profile directory.
//! Only file names and filesystem metadata are consulted here, archive
//! contents are never opened.

use crate::error::{Result, VaultError};
use crate::snapshot::TIMESTAMP_FORMAT;
use crate::types::{ArchiveInfo, ARCHIVE_EXTENSION, AUTO_MARKER};
use crate::utils;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

/// Maximum numbered suffix tried when a rename target collides
const MAX_RENAME_ATTEMPTS: u32 = 999;

/// Archive index over a single profile directory
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    profile_dir: PathBuf,
}

impl ArchiveIndex {
    /// Create an index over `profile_dir`
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
        }
    }

    /// Directory this index reads
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// List archives, most recently modified first
    ///
    /// Directories and files without the archive extension are ignored, so
    /// the `config` file and in-flight temporary files never show up. Archives
    /// sharing a modification time are ordered by name.
    pub fn list(&self) -> Result<Vec<ArchiveInfo>> {
        let mut archives = Vec::new();

        for entry in fs::read_dir(&self.profile_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                trace!("Skipping non UTF-8 file name in {:?}", self.profile_dir);
                continue;
            };
            if !is_archive_name(&name) {
                continue;
            }

            let metadata = entry.metadata()?;
            archives.push(ArchiveInfo {
                is_auto: is_auto_name(&name),
                size: metadata.len(),
                modified: utils::modified_utc(&metadata)?,
                name,
            });
        }

        archives.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        debug!("Found {} archives in {:?}", archives.len(), self.profile_dir);
        Ok(archives)
    }

    /// Full path of an existing archive
    ///
    /// # Errors
    ///
    /// - [`VaultError::Validation`]/[`VaultError::InvalidName`] for a bad name
    /// - [`VaultError::ArchiveNotFound`] if no such archive file exists
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        utils::validate_name("archive name", name)?;
        let path = self.profile_dir.join(name);
        if !path.is_file() {
            return Err(VaultError::ArchiveNotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Rename an archive without ever overwriting another one
    ///
    /// The archive extension is appended to `new_name` when missing. If the
    /// target is taken, a timestamp suffix is tried, then the timestamp plus
    /// a counter, up to a fixed number of attempts.
    ///
    /// Returns the name the archive ended up with.
    #[instrument(skip(self))]
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<String> {
        utils::validate_name("archive name", new_name)?;
        let source = self.path_of(old_name)?;

        let target = with_archive_extension(new_name);
        if target == old_name {
            debug!("Rename of {} onto itself, nothing to do", old_name);
            return Ok(target);
        }

        let target = self.free_name(&target)?;
        fs::rename(&source, self.profile_dir.join(&target))?;
        info!("Renamed archive {} to {}", old_name, target);
        Ok(target)
    }

    /// Delete a single archive
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        fs::remove_file(&path)?;
        info!("Removed archive {}", name);
        Ok(())
    }

    fn free_name(&self, wanted: &str) -> Result<String> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.free_name_at(wanted, &timestamp)
    }

    fn free_name_at(&self, wanted: &str, timestamp: &str) -> Result<String> {
        if !self.is_taken(wanted) {
            return Ok(wanted.to_string());
        }

        let stem = wanted
            .strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))
            .unwrap_or(wanted);

        let candidate = format!("{}_{}.{}", stem, timestamp, ARCHIVE_EXTENSION);
        if !self.is_taken(&candidate) {
            return Ok(candidate);
        }
        for attempt in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = format!("{}_{}_{}.{}", stem, timestamp, attempt, ARCHIVE_EXTENSION);
            if !self.is_taken(&candidate) {
                return Ok(candidate);
            }
        }
        Err(VaultError::RenameExhausted(wanted.to_string()))
    }

    fn is_taken(&self, name: &str) -> bool {
        fs::symlink_metadata(self.profile_dir.join(name)).is_ok()
    }
}

/// Whether `name` carries the archive extension
pub fn is_archive_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext == ARCHIVE_EXTENSION)
        .unwrap_or(false)
}

/// Whether `name` is a safeguard archive name
pub fn is_auto_name(name: &str) -> bool {
    name.strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))
        .map(|stem| stem.ends_with(&format!("_{}", AUTO_MARKER)))
        .unwrap_or(false)
}

fn with_archive_extension(name: &str) -> String {
    if is_archive_name(name) {
        name.to_string()
    } else {
        format!("{}.{}", name, ARCHIVE_EXTENSION)
    }
}
