//! Core data types used throughout the savevault library
//!
//! This module contains the data structures shared between the snapshot
//! engine components and the [`Vault`](crate::Vault) facade.
//!
//! ## Overview
//!
//! - **Archive content**: [`ArchiveManifest`], [`ArchiveMember`] - what a snapshot holds
//!   and where each member must be restored to
//! - **Operation results**: [`SnapshotInfo`], [`RestoreResult`] - outcome of backup and restore
//! - **Listings**: [`ArchiveInfo`] - one row of the archive index
//! - **Configuration**: [`VaultConfig`], [`VaultMetadata`] - settings persisted in the root

use crate::compression::CompressionLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extension of every archive file (without the dot)
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Marker segment appended to safeguard archive names
pub const AUTO_MARKER: &str = "auto";

/// Name of the first entry of every archive, holding the [`ArchiveManifest`]
///
/// The leading slash keeps it out of reach of member names, which are always
/// relative.
pub const MANIFEST_ENTRY: &str = "/.savevault-manifest.json";

/// Current manifest format version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// One file stored in an archive
///
/// # Examples
///
/// ```rust
/// # use savevault::types::ArchiveMember;
/// let member = ArchiveMember {
///     archive_path: "saves/slot1.sav".to_string(),
///     source_path: "/home/user/game/saves/slot1.sav".to_string(),
///     size: 4096,
/// };
/// assert!(member.source_path.ends_with(&member.archive_path));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Normalized, forward-slash relative name inside the archive
    pub archive_path: String,
    /// Original absolute path the member is restored to
    pub source_path: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Structured description of an archive, stored as its first entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveManifest {
    /// Version of the manifest format
    pub format_version: u32,
    /// Profile the archive belongs to
    pub profile: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// MD5 hex digest over member contents in member order
    pub digest: String,
    /// Whether this is a safeguard archive taken before a restore
    pub auto: bool,
    /// Members in archive order
    pub members: Vec<ArchiveMember>,
}

impl ArchiveManifest {
    /// Total uncompressed size of all members
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|m| m.size).sum()
    }

    /// Look up the restore target of a member by its in-archive name
    pub fn target_of(&self, archive_path: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.archive_path == archive_path)
            .map(|m| m.source_path.as_str())
    }
}

/// Result of a snapshot (backup) operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Archive file name inside the profile directory
    pub name: String,
    /// Full path of the written archive
    pub path: PathBuf,
    /// MD5 hex digest over member contents
    pub digest: String,
    /// Number of member files
    pub member_count: usize,
    /// Total uncompressed size of members
    pub total_size: u64,
    /// Size of the archive file on disk
    pub archive_size: u64,
    /// Whether this is a safeguard archive
    pub auto: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Result of a restore operation
///
/// Contains statistics and information about a completed restore operation,
/// including any warnings that occurred during the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Archive that was restored
    pub archive: String,
    /// Safeguard archive taken before any live file was touched
    pub safeguard: Option<String>,
    /// Number of live files deleted before extraction
    pub files_deleted: usize,
    /// Number of files written from the archive
    pub files_restored: usize,
    /// Total bytes written
    pub bytes_written: u64,
    /// Time taken for restoration in milliseconds
    pub duration_ms: u64,
    /// Any warnings during restoration
    pub warnings: Vec<String>,
}

/// One entry of a profile's archive index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Archive file name
    pub name: String,
    /// Size on disk in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Whether the name carries the safeguard marker
    pub is_auto: bool,
}

/// Configuration for a vault instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root directory holding one subdirectory per profile
    pub root: PathBuf,
    /// Deflate level used for archive entries
    pub compression_level: CompressionLevel,
    /// Whether directory walks follow symbolic links
    pub follow_symlinks: bool,
    /// savevault version that wrote this config
    pub version: String,
}

/// Metadata stored at the vault root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultMetadata {
    /// Version of the root layout
    pub format_version: u32,
    /// savevault version that created the root
    pub savevault_version: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last accessed timestamp
    pub last_accessed: DateTime<Utc>,
    /// Configuration
    pub config: VaultConfig,
}
