//! Error types for the savevault library
//!
//! This module defines all error types that can occur during vault operations.
//! Variants fall into four groups:
//!
//! - **Validation**: bad names or arguments, rejected before any I/O
//! - **Fatal I/O**: read/write/stat/walk failures, surfaced unmodified
//! - **Structural**: malformed archive entries or input paths
//! - **Aggregated**: the restore destructive phase, the only place where
//!   several failures are collected into one error

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the savevault library
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for all vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors reading or writing the zip container
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A required argument was empty or otherwise unusable
    #[error("Validation error: {0}")]
    Validation(String),

    /// Profile or archive name is not a single plain path component
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Profile directory does not exist
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile directory already exists
    #[error("Profile already exists: {0}")]
    ProfileAlreadyExists(String),

    /// Archive file does not exist in the profile directory
    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),

    /// Path is not part of the profile's tracked path set
    #[error("Path is not tracked: {0:?}")]
    TrackedPathNotFound(PathBuf),

    /// Tracked paths resolved to no files at all
    #[error("Nothing to snapshot for profile {0}: no tracked file exists")]
    EmptyFileSet(String),

    /// A source path normalized to an empty in-archive name
    #[error("Empty archive entry name for {0:?}")]
    EmptyArchiveEntryName(PathBuf),

    /// Two members (or a member and the manifest) share an in-archive name
    #[error("Duplicate archive entry: {0}")]
    DuplicateArchiveEntry(String),

    /// Archive entry carries no original absolute path
    #[error("Empty target path for archive entry {0}")]
    MissingRestoreTarget(String),

    /// Manifest is present but inconsistent with the archive content
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Path conversion error
    #[error("Path conversion error: {0:?}")]
    PathConversion(std::ffi::OsString),

    /// Rename found no free target name within the attempt budget
    #[error("No free archive name found for {0}")]
    RenameExhausted(String),

    /// Some live files could not be deleted before extraction
    #[error(
        "Restore incomplete: {} file(s) could not be deleted{}",
        .failures.len(),
        .extraction.as_ref().map(|e| format!(", extraction failed: {}", e)).unwrap_or_default()
    )]
    RestoreIncomplete {
        /// Safeguard archive holding the pre-restore state
        safeguard: Option<String>,
        /// One message per failed deletion
        failures: Vec<String>,
        /// Error that stopped extraction, if it did not finish
        extraction: Option<String>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl VaultError {
    /// Create a validation error with a custom message
    pub fn validation(msg: impl Into<String>) -> Self {
        VaultError::Validation(msg.into())
    }

    /// Check if this error was raised before any I/O took place
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            VaultError::Validation(_)
                | VaultError::InvalidName(_)
                | VaultError::ProfileNotFound(_)
                | VaultError::ProfileAlreadyExists(_)
                | VaultError::ArchiveNotFound(_)
                | VaultError::TrackedPathNotFound(_)
        )
    }

    /// Check if this error indicates a malformed archive or input path
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            VaultError::EmptyArchiveEntryName(_)
                | VaultError::DuplicateArchiveEntry(_)
                | VaultError::MissingRestoreTarget(_)
                | VaultError::InvalidManifest(_)
                | VaultError::PathConversion(_)
                | VaultError::Zip(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            VaultError::ProfileNotFound(name) => {
                format!("Profile '{}' not found. Use 'profiles' to see available profiles.", name)
            }
            VaultError::ArchiveNotFound(name) => {
                format!("Archive '{}' not found. Use 'archives <profile>' to list archives.", name)
            }
            VaultError::EmptyFileSet(name) => {
                format!(
                    "None of the paths tracked by '{}' exist. Use 'track' to add files or directories.",
                    name
                )
            }
            VaultError::RestoreIncomplete {
                safeguard,
                failures,
                extraction,
            } => {
                let mut msg = match extraction {
                    None => format!(
                        "Archive restored, but {} live file(s) could not be deleted first:",
                        failures.len()
                    ),
                    Some(cause) => format!(
                        "Archive only partly restored ({}). {} live file(s) could not be deleted first:",
                        cause,
                        failures.len()
                    ),
                };
                for failure in failures {
                    msg.push_str("\n  - ");
                    msg.push_str(failure);
                }
                if let Some(name) = safeguard {
                    msg.push_str(&format!("\nPre-restore state is saved in '{}'.", name));
                }
                msg
            }
            _ => self.to_string(),
        }
    }
}
