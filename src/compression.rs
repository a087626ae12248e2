//! Compression settings for archive entries
//!
//! Archives are standard deflate-compressed zip containers. The only knob is
//! the deflate level, exposed as a [`CompressionLevel`] so callers pick a
//! speed/size tradeoff without knowing zip option details.
//!
//! ```rust
//! use savevault::CompressionLevel;
//!
//! assert_eq!(CompressionLevel::default(), CompressionLevel::Balanced);
//! assert_eq!(CompressionLevel::Best.deflate_level(), 9);
//! ```

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Unix mode recorded for every archive entry and restored file
pub const FILE_MODE: u32 = 0o644;

/// Deflate level used when writing archive entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Deflate level 1 - quickest snapshots
    Fast,
    /// Deflate level 6 (default)
    #[default]
    Balanced,
    /// Deflate level 9 - smallest archives
    Best,
}

impl CompressionLevel {
    /// Numeric deflate level
    pub fn deflate_level(self) -> i64 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Balanced => 6,
            CompressionLevel::Best => 9,
        }
    }

    /// Zip options for an entry of `size` uncompressed bytes
    pub(crate) fn entry_options(self, size: u64) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.deflate_level() as _))
            .unix_permissions(FILE_MODE)
            .large_file(size >= u32::MAX as u64)
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionLevel::Fast => write!(f, "fast"),
            CompressionLevel::Balanced => write!(f, "balanced"),
            CompressionLevel::Best => write!(f, "best"),
        }
    }
}
