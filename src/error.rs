//! Error types for Baron Builder
//!
//! Provides a unified error type for all operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::container::Codec;
use crate::transfer::{TransferKind, TransferState};

/// Result type alias using BaronError
pub type Result<T> = std::result::Result<T, BaronError>;

/// Unified error type for Baron Builder operations
#[derive(Debug, Error)]
pub enum BaronError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to {action} {}: {source}", path.display())]
    IoAt {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Argument / Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No entry for {filename} in {}", manifest.display())]
    EntryNotFound { manifest: PathBuf, filename: String },

    // -------------------------------------------------------------------------
    // Container Errors
    // -------------------------------------------------------------------------
    #[error("Member {member} uses unsupported compression method {method}")]
    CodecUnknown { member: String, method: String },

    #[error("Member {member} has no codec entry; register it before repacking")]
    CodecMissing { member: String },

    #[error("Member {member} was modified but {codec} cannot be written")]
    CodecUnwritable { member: String, codec: Codec },

    #[error("Zip error in {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    // -------------------------------------------------------------------------
    // Manifest Errors
    // -------------------------------------------------------------------------
    #[error("Manifest {} is corrupt: {reason}", path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Transfer Errors
    // -------------------------------------------------------------------------
    #[error("{kind} transfer #{transfer_id} stopped after {reached}: {reason}")]
    PartialTransfer {
        transfer_id: u64,
        kind: TransferKind,
        reached: TransferState,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("Journal corruption detected: {0}")]
    JournalCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BaronError {
    /// Wrap a zip error with the container it came from
    pub fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        BaronError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error leaves a storage location out of step with its manifest
    pub fn is_consistency_warning(&self) -> bool {
        matches!(self, BaronError::PartialTransfer { .. })
    }
}

/// Attach the failing step and file to low-level I/O errors
pub trait ResultExt<T> {
    fn at(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn at(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| BaronError::IoAt {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<T> ResultExt<T> for zip::result::ZipResult<T> {
    fn at(self, _action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| BaronError::zip(path, source))
    }
}
