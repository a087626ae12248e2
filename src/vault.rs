//! Main vault implementation
//!
//! [`Vault`] is the entry point of the library. It owns the explicit
//! configuration (root directory, compression level, symlink policy) and wires
//! it into the engine components:
//!
//! - [`ProfileStore`]: profile directories and tracked path sets
//! - [`FileSetResolver`]: tracked paths to concrete file sets
//! - [`SnapshotBuilder`]: file sets to archives
//! - [`RestoreTransaction`]: archives back onto the filesystem
//! - [`ArchiveIndex`]: listing, renaming and removing archives
//!
//! ## Concurrency
//!
//! `Vault` performs no internal locking. Callers must not run two operations
//! on the same profile at the same time.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use savevault::Vault;
//!
//! # fn main() -> savevault::Result<()> {
//! let vault = Vault::open("/home/user/game_saves")?;
//! vault.create_profile("Elden Ring")?;
//! vault.add_tracked_paths("Elden Ring", &["/home/user/.steam/EldenRing/saves"])?;
//!
//! let snapshot = vault.backup("Elden Ring")?;
//! // ... play, break things ...
//! vault.restore("Elden Ring", &snapshot.name)?;
//! # Ok(())
//! # }
//! ```

use crate::archive_index::ArchiveIndex;
use crate::compression::CompressionLevel;
use crate::error::{Result, VaultError};
use crate::file_tracking::FileSetResolver;
use crate::profile::ProfileStore;
use crate::restore::{self, RestoreTransaction};
use crate::snapshot::SnapshotBuilder;
use crate::types::*;
use crate::utils;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Name of the metadata file at the vault root
pub const METADATA_FILE: &str = "vault.json";

/// Current layout version of the vault root
pub const VAULT_FORMAT_VERSION: u32 = 1;

/// Snapshot vault over one root directory
///
/// # Examples
///
/// ```rust,no_run
/// use savevault::{CompressionLevel, Vault, VaultBuilder};
///
/// # fn main() -> savevault::Result<()> {
/// // Persisted settings (defaults on first use)
/// let vault = Vault::open("./game_saves")?;
///
/// // Explicit settings, persisted for later opens
/// let vault = VaultBuilder::new()
///     .compression_level(CompressionLevel::Best)
///     .build("./game_saves")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    profiles: ProfileStore,
    resolver: FileSetResolver,
    builder: SnapshotBuilder,
}

impl Vault {
    /// Open the vault at `root`, creating it with default settings if needed
    ///
    /// An existing root keeps its persisted settings and gets its
    /// `last_accessed` timestamp refreshed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        VaultBuilder::new().build(root)
    }

    fn from_config(config: VaultConfig) -> Self {
        Self {
            profiles: ProfileStore::new(&config.root),
            resolver: FileSetResolver::new().with_follow_symlinks(config.follow_symlinks),
            builder: SnapshotBuilder::new(config.compression_level),
            config,
        }
    }

    /// Root directory of the vault
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Active configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Names of all profiles, sorted
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        self.profiles.list()
    }

    /// Create a new, empty profile
    pub fn create_profile(&self, name: &str) -> Result<PathBuf> {
        self.profiles.create(name)
    }

    /// Delete a profile and all of its archives
    pub fn remove_profile(&self, name: &str) -> Result<()> {
        self.profiles.remove(name)
    }

    /// Directory holding a profile's config and archives
    pub fn profile_dir(&self, name: &str) -> Result<PathBuf> {
        self.profiles.dir(name)
    }

    /// Tracked path set of a profile
    pub fn tracked_paths(&self, name: &str) -> Result<Vec<PathBuf>> {
        self.profiles.tracked_paths(name)
    }

    /// Add paths to a profile's tracked path set
    pub fn add_tracked_paths<P: AsRef<Path>>(&self, name: &str, paths: &[P]) -> Result<Vec<PathBuf>> {
        self.profiles.add_tracked_paths(name, paths)
    }

    /// Remove a path from a profile's tracked path set
    pub fn remove_tracked_path(&self, name: &str, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.profiles.remove_tracked_path(name, path.as_ref())
    }

    /// Snapshot the files currently tracked by `profile`
    ///
    /// # Errors
    ///
    /// - [`VaultError::ProfileNotFound`] if the profile does not exist
    /// - [`VaultError::EmptyFileSet`] if none of the tracked paths holds a file
    /// - any resolution or build error, in which case no archive is written
    #[instrument(skip(self))]
    pub fn backup(&self, profile: &str) -> Result<SnapshotInfo> {
        let dir = self.profiles.dir(profile)?;
        let tracked = self.profiles.tracked_paths(profile)?;
        let files = self.resolver.resolve(&tracked)?;
        self.builder.write(&dir, profile, &files, false)
    }

    /// Restore an archive of `profile` over its tracked files
    ///
    /// A safeguard archive of the current state is always written before any
    /// live file is deleted. See [`RestoreTransaction`] for the full sequence.
    #[instrument(skip(self))]
    pub fn restore(&self, profile: &str, archive: &str) -> Result<RestoreResult> {
        utils::validate_name("archive name", archive)?;
        let dir = self.profiles.dir(profile)?;
        let tracked = self.profiles.tracked_paths(profile)?;
        RestoreTransaction::new(profile, &dir, &self.resolver, &self.builder).run(&tracked, archive)
    }

    /// Archives of `profile`, most recent first
    pub fn list_archives(&self, profile: &str) -> Result<Vec<ArchiveInfo>> {
        self.index(profile)?.list()
    }

    /// Rename an archive, returning its final name
    pub fn rename_archive(&self, profile: &str, old_name: &str, new_name: &str) -> Result<String> {
        self.index(profile)?.rename(old_name, new_name)
    }

    /// Delete a single archive
    pub fn remove_archive(&self, profile: &str, archive: &str) -> Result<()> {
        self.index(profile)?.remove(archive)
    }

    /// Manifest of an archive
    pub fn inspect_archive(&self, profile: &str, archive: &str) -> Result<ArchiveManifest> {
        let path = self.index(profile)?.path_of(archive)?;
        restore::load_manifest(&path, profile)
    }

    fn index(&self, profile: &str) -> Result<ArchiveIndex> {
        Ok(ArchiveIndex::new(self.profiles.dir(profile)?))
    }
}

/// Builder for [`Vault`] with custom settings
///
/// Settings left unset keep their persisted value when the root already
/// exists, or the default for a new root.
#[derive(Debug, Default, Clone)]
pub struct VaultBuilder {
    compression_level: Option<CompressionLevel>,
    follow_symlinks: Option<bool>,
}

impl VaultBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deflate level for new archives
    pub fn compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Set whether directory walks follow symbolic links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = Some(follow);
        self
    }

    /// Open or create the vault at `root`
    ///
    /// # Errors
    ///
    /// - [`VaultError::Io`] if the root cannot be created or `vault.json` written
    /// - [`VaultError::Json`] if an existing `vault.json` is malformed
    /// - [`VaultError::InvalidConfiguration`] if `root` exists but is not a
    ///   directory, or was written by a newer layout version
    #[instrument(skip(self, root))]
    pub fn build(self, root: impl Into<PathBuf>) -> Result<Vault> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(VaultError::InvalidConfiguration(format!(
                "vault root {:?} is not a directory",
                root
            )));
        }
        fs::create_dir_all(&root)?;

        let metadata_path = root.join(METADATA_FILE);
        let now = Utc::now();
        let metadata = if metadata_path.exists() {
            let mut metadata: VaultMetadata = serde_json::from_str(&fs::read_to_string(&metadata_path)?)?;
            if metadata.format_version > VAULT_FORMAT_VERSION {
                return Err(VaultError::InvalidConfiguration(format!(
                    "vault format version {} is newer than supported version {}",
                    metadata.format_version, VAULT_FORMAT_VERSION
                )));
            }
            metadata.last_accessed = now;
            self.apply(&mut metadata.config, &root);
            debug!("Opened vault at {:?}", root);
            metadata
        } else {
            let mut config = VaultConfig {
                root: root.clone(),
                compression_level: CompressionLevel::default(),
                follow_symlinks: false,
                version: env!("CARGO_PKG_VERSION").to_string(),
            };
            self.apply(&mut config, &root);
            info!("Initialized vault at {:?}", root);
            VaultMetadata {
                format_version: VAULT_FORMAT_VERSION,
                savevault_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: now,
                last_accessed: now,
                config,
            }
        };

        utils::atomic_write(&metadata_path, serde_json::to_string_pretty(&metadata)?.as_bytes())?;
        Ok(Vault::from_config(metadata.config))
    }

    fn apply(&self, config: &mut VaultConfig, root: &Path) {
        config.root = root.to_path_buf();
        config.version = env!("CARGO_PKG_VERSION").to_string();
        if let Some(level) = self.compression_level {
            config.compression_level = level;
        }
        if let Some(follow) = self.follow_symlinks {
            config.follow_symlinks = follow;
        }
    }
}
