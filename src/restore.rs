//! Restore transaction
//!
//! Restoring an archive replaces the live state of a profile's tracked files
//! with the archive content. The transaction runs in a fixed order:
//!
//! 1. **Safeguard**: snapshot the current tracked files as an auto archive.
//!    If this fails nothing else happens.
//! 2. **Staging**: open the requested archive, read every member into memory
//!    and resolve every target path. Malformed archives are rejected here,
//!    while the live files are still untouched.
//! 3. **Deletion**: delete every file that fed the safeguard. Failures are
//!    collected, not fatal.
//! 4. **Extraction**: write every staged member to its recorded absolute path.
//!
//! A crash can only lose data between steps 3 and 4, and the safeguard
//! archive always holds the pre-restore state at that point.

use crate::error::{Result, VaultError};
use crate::compression::FILE_MODE;
use crate::file_tracking::FileSetResolver;
use crate::snapshot::{read_manifest, SnapshotBuilder};
use crate::types::{ArchiveManifest, ArchiveMember, RestoreResult, AUTO_MARKER, MANIFEST_ENTRY};
use crate::utils;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};
use zip::ZipArchive;

/// Manifest format version reported for archives that carry no manifest
pub const LEGACY_FORMAT_VERSION: u32 = 0;

/// A member read out of an archive, ready to be written
#[derive(Debug)]
struct StagedFile {
    target: PathBuf,
    content: Vec<u8>,
}

/// Restores archives of one profile
#[derive(Debug, Clone)]
pub struct RestoreTransaction<'a> {
    profile: &'a str,
    profile_dir: &'a Path,
    resolver: &'a FileSetResolver,
    builder: &'a SnapshotBuilder,
}

impl<'a> RestoreTransaction<'a> {
    /// Prepare a transaction for `profile` stored in `profile_dir`
    pub fn new(
        profile: &'a str,
        profile_dir: &'a Path,
        resolver: &'a FileSetResolver,
        builder: &'a SnapshotBuilder,
    ) -> Self {
        Self {
            profile,
            profile_dir,
            resolver,
            builder,
        }
    }

    /// Restore `archive_name` over the files currently tracked by `tracked`
    ///
    /// # Errors
    ///
    /// - [`VaultError::ArchiveNotFound`] if the archive does not exist (nothing touched)
    /// - any error from the safeguard snapshot (nothing touched)
    /// - [`VaultError::MissingRestoreTarget`]/[`VaultError::InvalidManifest`] or zip
    ///   errors while staging (safeguard written, live files untouched)
    /// - [`VaultError::Io`] while writing restored files (aborts the remaining writes)
    /// - [`VaultError::RestoreIncomplete`] if some live files could not be
    ///   deleted beforehand; extraction still runs and its error, if any, is
    ///   carried along
    #[instrument(skip(self, tracked), fields(profile = self.profile))]
    pub fn run(&self, tracked: &[PathBuf], archive_name: &str) -> Result<RestoreResult> {
        let start = Instant::now();
        utils::validate_name("archive name", archive_name)?;
        let archive_path = self.profile_dir.join(archive_name);
        if !archive_path.is_file() {
            return Err(VaultError::ArchiveNotFound(archive_name.to_string()));
        }
        info!("Restoring archive {}", archive_name);

        let mut result = RestoreResult {
            archive: archive_name.to_string(),
            ..Default::default()
        };

        // Safeguard
        let live_files = self.resolver.resolve(tracked)?;
        if live_files.is_empty() {
            let msg = "No tracked file exists, skipping safeguard snapshot".to_string();
            warn!("{}", msg);
            result.warnings.push(msg);
        } else {
            let safeguard = self.builder.write(self.profile_dir, self.profile, &live_files, true)?;
            debug!("Safeguard archive {} taken", safeguard.name);
            result.safeguard = Some(safeguard.name);
        }

        // Staging
        let staged = stage_archive(&archive_path, self.profile)?;
        debug!("Staged {} members from {}", staged.len(), archive_name);

        let mut result = replace_live(&live_files, &staged, result)?;
        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Restored {} in {}ms ({} files restored, {} deleted)",
            archive_name, result.duration_ms, result.files_restored, result.files_deleted
        );
        Ok(result)
    }
}

/// Delete `live_files`, then write every staged member
///
/// Deletion failures are collected and extraction still runs. If any were
/// collected the outcome is [`VaultError::RestoreIncomplete`], which also
/// carries the extraction error when extraction stopped early.
fn replace_live(
    live_files: &[PathBuf],
    staged: &[StagedFile],
    mut result: RestoreResult,
) -> Result<RestoreResult> {
    let mut failures = Vec::new();
    for path in live_files {
        match fs::remove_file(path) {
            Ok(()) => {
                result.files_deleted += 1;
                trace!("Deleted live file {:?}", path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("Live file {:?} already gone", path);
            }
            Err(e) => {
                warn!("Failed to delete {:?}: {}", path, e);
                failures.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    let extraction = staged
        .iter()
        .try_for_each(|file| extract(file, &mut result));

    match (extraction, failures.is_empty()) {
        (Ok(()), true) => Ok(result),
        (Err(e), true) => Err(e),
        (extraction, false) => Err(VaultError::RestoreIncomplete {
            safeguard: result.safeguard,
            failures,
            extraction: extraction.err().map(|e| e.to_string()),
        }),
    }
}

fn extract(file: &StagedFile, result: &mut RestoreResult) -> Result<()> {
    if let Some(parent) = file.target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file.target, &file.content)?;
    utils::set_permissions(&file.target, FILE_MODE)?;
    result.files_restored += 1;
    result.bytes_written += file.content.len() as u64;
    trace!("Restored {:?} ({} bytes)", file.target, file.content.len());
    Ok(())
}

/// Load the manifest of the archive at `path`
///
/// Archives without a manifest entry get one synthesized from their entry
/// comments, with [`LEGACY_FORMAT_VERSION`] as format version, the digest
/// taken from the file name and the file's modification time as creation time.
pub fn load_manifest(path: &Path, profile: &str) -> Result<ArchiveManifest> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    archive_manifest(&mut archive, path, profile)
}

fn archive_manifest<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    profile: &str,
) -> Result<ArchiveManifest> {
    if let Some(manifest) = read_manifest(archive)? {
        return Ok(manifest);
    }

    debug!("Archive {:?} has no manifest, reading entry comments", path);
    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        members.push(ArchiveMember {
            archive_path: entry.name().to_string(),
            source_path: entry.comment().to_string(),
            size: entry.size(),
        });
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let (digest, auto) = parse_archive_name(file_name);

    Ok(ArchiveManifest {
        format_version: LEGACY_FORMAT_VERSION,
        profile: profile.to_string(),
        created_at: utils::modified_utc(&fs::metadata(path)?)?,
        digest,
        auto,
        members,
    })
}

/// Read every member of the archive at `path` along with its target path
fn stage_archive(path: &Path, profile: &str) -> Result<Vec<StagedFile>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let manifest = archive_manifest(&mut archive, path, profile)?;

    let mut targets: HashMap<&str, &str> = HashMap::with_capacity(manifest.members.len());
    for member in &manifest.members {
        if targets.insert(&member.archive_path, &member.source_path).is_some() {
            return Err(VaultError::DuplicateArchiveEntry(member.archive_path.clone()));
        }
    }

    let mut staged = Vec::with_capacity(manifest.members.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || entry.name() == MANIFEST_ENTRY {
            continue;
        }

        let name = entry.name().to_string();
        let target = match targets.remove(name.as_str()) {
            Some(target) if !target.is_empty() => PathBuf::from(target),
            Some(_) => return Err(VaultError::MissingRestoreTarget(name)),
            None => {
                return Err(VaultError::InvalidManifest(format!(
                    "entry {} is not listed in the manifest",
                    name
                )))
            }
        };
        if !target.is_absolute() {
            return Err(VaultError::InvalidManifest(format!(
                "target of {} is not an absolute path: {:?}",
                name, target
            )));
        }

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        staged.push(StagedFile { target, content });
    }

    if let Some(missing) = targets.keys().next() {
        return Err(VaultError::InvalidManifest(format!(
            "member {} is missing from the archive",
            missing
        )));
    }
    Ok(staged)
}

/// Extract `(digest, auto)` from `{profile}_{timestamp}_{digest}[_auto].zip`
fn parse_archive_name(name: &str) -> (String, bool) {
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    let marker = format!("_{}", AUTO_MARKER);
    let (stem, auto) = match stem.strip_suffix(&marker) {
        Some(stem) => (stem, true),
        None => (stem, false),
    };
    let digest = stem
        .rsplit_once('_')
        .map(|(_, digest)| digest)
        .filter(|d| d.len() == 32 && d.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or_default();
    (digest.to_string(), auto)
}
