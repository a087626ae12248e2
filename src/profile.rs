//! Profile directories and their tracked path sets
//!
//! Every profile is a directory directly under the vault root. Its tracked
//! path set lives in a plain `config` file, one absolute path per line:
//!
//! ```text
//! root/
//! ├── vault.json
//! └── Elden Ring/
//!     ├── config                                   # tracked paths
//!     └── Elden Ring_20240101_120000_<md5>.zip     # archives
//! ```
//!
//! Reading the set ignores blank lines and collapses duplicates. Every
//! mutation rewrites the whole file atomically in sorted order.

use crate::error::{Result, VaultError};
use crate::utils;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Name of the tracked path file inside a profile directory
pub const CONFIG_FILE: &str = "config";

/// Profile bookkeeping rooted at one directory
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Create a store over `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding the profiles
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all profiles, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create an empty profile directory
    #[instrument(skip(self))]
    pub fn create(&self, name: &str) -> Result<PathBuf> {
        utils::validate_name("profile name", name)?;
        let dir = self.root.join(name);
        if dir.exists() {
            return Err(VaultError::ProfileAlreadyExists(name.to_string()));
        }

        fs::create_dir_all(&self.root)?;
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(VaultError::ProfileAlreadyExists(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        info!("Created profile {}", name);
        Ok(dir)
    }

    /// Delete a profile directory along with all of its archives
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.dir(name)?;
        fs::remove_dir_all(&dir)?;
        info!("Removed profile {}", name);
        Ok(())
    }

    /// Directory of an existing profile
    pub fn dir(&self, name: &str) -> Result<PathBuf> {
        utils::validate_name("profile name", name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(VaultError::ProfileNotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Tracked path set of a profile, sorted and deduplicated
    ///
    /// A profile without a `config` file tracks nothing.
    pub fn tracked_paths(&self, name: &str) -> Result<Vec<PathBuf>> {
        let dir = self.dir(name)?;
        Ok(read_tracked(&dir)?.into_iter().collect())
    }

    /// Merge `paths` into the tracked path set
    ///
    /// Paths must be absolute and valid UTF-8 without line breaks. An empty
    /// `paths` leaves the file untouched. Returns the updated set.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub fn add_tracked_paths<P: AsRef<Path>>(&self, name: &str, paths: &[P]) -> Result<Vec<PathBuf>> {
        let dir = self.dir(name)?;
        for path in paths {
            check_trackable(path.as_ref())?;
        }

        let mut tracked = read_tracked(&dir)?;
        if paths.is_empty() {
            return Ok(tracked.into_iter().collect());
        }

        let before = tracked.len();
        tracked.extend(paths.iter().map(|p| p.as_ref().to_path_buf()));
        write_tracked(&dir, &tracked)?;
        debug!("Tracking {} paths ({} new)", tracked.len(), tracked.len() - before);
        Ok(tracked.into_iter().collect())
    }

    /// Remove one path from the tracked path set
    ///
    /// # Errors
    ///
    /// - [`VaultError::Validation`] if the profile name or the path is empty
    /// - [`VaultError::TrackedPathNotFound`] if the path is not tracked
    ///
    /// The `config` file is only rewritten on success.
    #[instrument(skip(self))]
    pub fn remove_tracked_path(&self, name: &str, path: &Path) -> Result<Vec<PathBuf>> {
        utils::validate_name("profile name", name)?;
        if path.as_os_str().is_empty() {
            return Err(VaultError::validation("empty path"));
        }
        let dir = self.dir(name)?;

        let mut tracked = read_tracked(&dir)?;
        if !tracked.remove(path) {
            return Err(VaultError::TrackedPathNotFound(path.to_path_buf()));
        }
        write_tracked(&dir, &tracked)?;
        debug!("Stopped tracking {:?}", path);
        Ok(tracked.into_iter().collect())
    }
}

fn check_trackable(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(VaultError::validation("empty path"));
    }
    let text = path
        .to_str()
        .ok_or_else(|| VaultError::PathConversion(path.as_os_str().to_os_string()))?;
    if text.contains(['\n', '\r']) {
        return Err(VaultError::validation(format!("line break in path {:?}", text)));
    }
    if !path.is_absolute() {
        return Err(VaultError::validation(format!("tracked path must be absolute: {}", text)));
    }
    Ok(())
}

fn read_tracked(profile_dir: &Path) -> Result<BTreeSet<PathBuf>> {
    let content = match fs::read_to_string(profile_dir.join(CONFIG_FILE)) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn write_tracked(profile_dir: &Path, tracked: &BTreeSet<PathBuf>) -> Result<()> {
    let lines: Vec<String> = tracked
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    utils::atomic_write(&profile_dir.join(CONFIG_FILE), lines.join("\n").as_bytes())
}
