//! Snapshot archive construction
//!
//! [`SnapshotBuilder`] packs a resolved file set into a single zip archive held
//! entirely in memory, and only writes it to the profile directory once it has
//! been completely and successfully finalized. A crash or read failure midway
//! therefore never leaves a partial archive on disk.
//!
//! ## Archive layout
//!
//! ```text
//! {profile}_{YYYYmmdd_HHMMSS}_{md5}[_auto].zip
//! ├── /.savevault-manifest.json  # ArchiveManifest, always the first entry
//! ├── a.txt                      # members, named relative to the anchor
//! ├── dir/f1.txt
//! └── dir/sub/f2.txt
//! ```
//!
//! ## Content digest
//!
//! The MD5 digest is fed with the raw bytes of every member in sorted order and
//! nothing else: names, source paths and timestamps do not contribute. Two
//! snapshots of identical contents therefore share a digest even when the files
//! live at different absolute paths, and their archive names differ only in the
//! timestamp segment.

use crate::compression::CompressionLevel;
use crate::error::{Result, VaultError};
use crate::paths::{anchor_of, archive_name};
use crate::types::{
    ArchiveManifest, ArchiveMember, SnapshotInfo, ARCHIVE_EXTENSION, AUTO_MARKER,
    MANIFEST_ENTRY, MANIFEST_FORMAT_VERSION,
};
use crate::utils;
use chrono::{DateTime, Local, Utc};
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};
use zip::{ZipArchive, ZipWriter};

/// Timestamp format used in archive names (second precision, local time)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A fully finalized archive that has not been written anywhere yet
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    /// Archive file name
    pub name: String,
    /// Complete zip bytes
    pub bytes: Vec<u8>,
    /// Manifest stored as the first entry
    pub manifest: ArchiveManifest,
}

/// Builds snapshot archives from resolved file sets
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder {
    compression: CompressionLevel,
}

impl SnapshotBuilder {
    /// Create a builder writing entries at the given deflate level
    pub fn new(compression: CompressionLevel) -> Self {
        Self { compression }
    }

    /// Build an archive of `files` for `profile` entirely in memory
    ///
    /// `files` must be the sorted output of
    /// [`FileSetResolver::resolve`](crate::file_tracking::FileSetResolver::resolve).
    ///
    /// # Errors
    ///
    /// - [`VaultError::EmptyFileSet`] if `files` is empty
    /// - [`VaultError::EmptyArchiveEntryName`] if a path normalizes to nothing
    /// - [`VaultError::DuplicateArchiveEntry`] if two paths normalize to the same name
    /// - [`VaultError::Io`] if any file cannot be read; the whole build is abandoned
    pub fn build(&self, profile: &str, files: &[PathBuf], auto: bool) -> Result<BuiltArchive> {
        if files.is_empty() {
            return Err(VaultError::EmptyFileSet(profile.to_string()));
        }

        let created_at = Utc::now();
        let anchor = anchor_of(files);
        debug!("Building snapshot of {} files anchored at {:?}", files.len(), anchor);

        // Members are compressed into a scratch archive first so that the
        // manifest, which needs the final digest, can lead the real archive.
        let mut scratch = ZipWriter::new(Cursor::new(Vec::new()));
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(files.len());
        let mut digest = md5::Context::new();

        for path in files {
            let entry_name = archive_name(path, &anchor)?;
            if !seen.insert(entry_name.clone()) {
                return Err(VaultError::DuplicateArchiveEntry(entry_name));
            }
            let source_path = path
                .to_str()
                .ok_or_else(|| VaultError::PathConversion(path.as_os_str().to_os_string()))?
                .to_string();

            let content = fs::read(path)?;
            scratch.start_file(entry_name.as_str(), self.compression.entry_options(content.len() as u64))?;
            scratch.write_all(&content)?;
            digest.consume(&content);

            trace!("Packed {:?} as {} ({} bytes)", path, entry_name, content.len());
            members.push(ArchiveMember {
                archive_path: entry_name,
                source_path,
                size: content.len() as u64,
            });
        }

        let manifest = ArchiveManifest {
            format_version: MANIFEST_FORMAT_VERSION,
            profile: profile.to_string(),
            created_at,
            digest: hex::encode(digest.compute().0),
            auto,
            members,
        };

        let mut scratch = ZipArchive::new(scratch.finish()?)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        writer.start_file(MANIFEST_ENTRY, self.compression.entry_options(manifest_json.len() as u64))?;
        writer.write_all(&manifest_json)?;
        for index in 0..scratch.len() {
            writer.raw_copy_file(scratch.by_index_raw(index)?)?;
        }
        let bytes = writer.finish()?.into_inner();

        let name = archive_file_name(profile, created_at, &manifest.digest, auto);
        Ok(BuiltArchive { name, bytes, manifest })
    }

    /// Build an archive and write it into `profile_dir`
    ///
    /// Writes exactly one new file and never touches the source files.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub fn write(&self, profile_dir: &Path, profile: &str, files: &[PathBuf], auto: bool) -> Result<SnapshotInfo> {
        let built = self.build(profile, files, auto)?;
        let path = profile_dir.join(&built.name);
        utils::atomic_write(&path, &built.bytes)?;

        info!(
            "Wrote {}archive {} ({} files, {})",
            if auto { "safeguard " } else { "" },
            built.name,
            built.manifest.members.len(),
            utils::format_bytes(built.bytes.len() as u64)
        );

        Ok(SnapshotInfo {
            name: built.name,
            path,
            digest: built.manifest.digest.clone(),
            member_count: built.manifest.members.len(),
            total_size: built.manifest.total_size(),
            archive_size: built.bytes.len() as u64,
            auto,
            created_at: built.manifest.created_at,
        })
    }
}

/// Compose `{profile}_{timestamp}_{digest}[_auto].zip`
pub fn archive_file_name(profile: &str, created_at: DateTime<Utc>, digest: &str, auto: bool) -> String {
    let timestamp = created_at.with_timezone(&Local).format(TIMESTAMP_FORMAT);
    let marker = if auto {
        format!("_{}", AUTO_MARKER)
    } else {
        String::new()
    };
    format!("{}_{}_{}{}.{}", profile, timestamp, digest, marker, ARCHIVE_EXTENSION)
}

/// Read the manifest stored as the first entry of `archive`
///
/// Returns `Ok(None)` for archives written without a manifest, whose entries
/// carry their restore target in the zip entry comment instead.
pub fn read_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<ArchiveManifest>> {
    if archive.len() == 0 {
        return Ok(None);
    }
    let mut first = archive.by_index(0)?;
    if first.name() != MANIFEST_ENTRY {
        return Ok(None);
    }
    let mut json = Vec::with_capacity(first.size() as usize);
    first.read_to_end(&mut json)?;
    let manifest = serde_json::from_slice(&json)?;
    Ok(Some(manifest))
}
