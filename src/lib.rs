//! # savevault - Snapshots for named save profiles
//!
//! A library for taking point-in-time zip snapshots of user-selected files and
//! directories, and for restoring them to their original absolute locations.
//!
//! ## Overview
//!
//! savevault organizes tracked paths into named **profiles** (typically one per
//! game). For each profile you can:
//! - Track any number of absolute file or directory paths
//! - Snapshot everything currently under those paths into one archive
//! - List, rename and remove archives
//! - Restore an archive, with an automatic safeguard snapshot taken first
//!
//! ## Architecture
//!
//! The snapshot engine is built from a few small components:
//!
//! - **Path normalization** ([`paths`]): finds the tightest common ancestor of a
//!   file set and derives portable in-archive names from it
//! - **File set resolution** ([`file_tracking`]): expands tracked paths into
//!   the sorted set of files that exist right now
//! - **Snapshot building** ([`snapshot`]): packs a file set into an in-memory
//!   zip archive with an MD5 content digest and a manifest entry, then writes it
//!   in one shot
//! - **Restore** ([`restore`]): safeguard, stage, delete, extract
//! - **Archive index** ([`archive_index`]): recency-sorted listing, rename
//!   without overwrite, removal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use savevault::Vault;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = Vault::open("/home/user/game_saves")?;
//!
//! vault.create_profile("hollow-knight")?;
//! vault.add_tracked_paths("hollow-knight", &["/home/user/.config/unity3d/Team Cherry/Hollow Knight"])?;
//!
//! // Take a snapshot
//! let snapshot = vault.backup("hollow-knight")?;
//! println!("Created {} ({} files)", snapshot.name, snapshot.member_count);
//!
//! // Later: go back to it
//! let result = vault.restore("hollow-knight", &snapshot.name)?;
//! println!("Restored {} files", result.files_restored);
//! if let Some(safeguard) = result.safeguard {
//!     println!("Previous state kept in {}", safeguard);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom configuration
//!
//! ```rust,no_run
//! use savevault::{CompressionLevel, VaultBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = VaultBuilder::new()
//!     .compression_level(CompressionLevel::Best)
//!     .follow_symlinks(true)
//!     .build("/home/user/game_saves")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## On-disk layout
//!
//! ```text
//! game_saves/
//! ├── vault.json                                    # format version + config
//! └── hollow-knight/
//!     ├── config                                    # tracked paths, one per line
//!     ├── hollow-knight_20240101_120000_<md5>.zip
//!     └── hollow-knight_20240102_080000_<md5>_auto.zip
//! ```
//!
//! Each archive is a standard deflate zip. Its first entry,
//! `/.savevault-manifest.json`, lists every member with the absolute path it is
//! restored to. Archives without a manifest are restored from per-entry
//! comments instead.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`](Result), an alias over [`VaultError`].
//! Validation errors are raised before any I/O, I/O errors are passed through
//! unmodified, and the restore deletion phase is the only step that collects
//! several failures into one error ([`VaultError::RestoreIncomplete`]).
//!
//! ## Concurrency
//!
//! Operations are synchronous and take `&self`. There is no internal locking:
//! run at most one operation per profile at a time.

// Public API modules
pub mod archive_index;
pub mod compression;
pub mod error;
pub mod file_tracking;
pub mod paths;
pub mod profile;
pub mod restore;
pub mod snapshot;
pub mod types;
pub mod vault;

// Internal modules
mod utils;

// Re-export main types for convenience
pub use archive_index::ArchiveIndex;
pub use compression::CompressionLevel;
pub use error::{Result, VaultError};
pub use file_tracking::FileSetResolver;
pub use restore::RestoreTransaction;
pub use snapshot::SnapshotBuilder;
pub use types::*;
pub use vault::{Vault, VaultBuilder};
