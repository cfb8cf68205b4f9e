//! Transfer state machine
//!
//! ```text
//!   Started ─▶ FileMoved ─▶ SourceManifestUpdated ─▶ DestManifestUpdated ─▶ Committed
//!      │
//!      └─▶ Aborted   (a step failed before any file was written)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::LocationKind;

/// Which transfer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// Live → backup (copy)
    Backup,
    /// Live → archive (recompress, then delete the live save)
    Archive,
    /// Backup → live (copy)
    RestoreBackup,
    /// Archive → live (rebuild, then delete the archive)
    RestoreArchive,
}

impl TransferKind {
    pub fn source(self) -> LocationKind {
        match self {
            TransferKind::Backup | TransferKind::Archive => LocationKind::Live,
            TransferKind::RestoreBackup => LocationKind::Backup,
            TransferKind::RestoreArchive => LocationKind::Archive,
        }
    }

    pub fn destination(self) -> LocationKind {
        match self {
            TransferKind::Backup => LocationKind::Backup,
            TransferKind::Archive => LocationKind::Archive,
            TransferKind::RestoreBackup | TransferKind::RestoreArchive => LocationKind::Live,
        }
    }

    /// Whether the source file and entry are removed on commit
    pub fn moves_source(self) -> bool {
        matches!(self, TransferKind::Archive | TransferKind::RestoreArchive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferKind::Backup => "backup",
            TransferKind::Archive => "archive",
            TransferKind::RestoreBackup => "restore-backup",
            TransferKind::RestoreArchive => "restore-archive",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last step a transfer completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransferState {
    Started,
    FileMoved,
    SourceManifestUpdated,
    DestManifestUpdated,
    Committed,
    Aborted,
}

impl TransferState {
    /// The step that must follow this one on the success path
    pub fn next(self) -> Option<TransferState> {
        match self {
            TransferState::Started => Some(TransferState::FileMoved),
            TransferState::FileMoved => Some(TransferState::SourceManifestUpdated),
            TransferState::SourceManifestUpdated => Some(TransferState::DestManifestUpdated),
            TransferState::DestManifestUpdated => Some(TransferState::Committed),
            TransferState::Committed | TransferState::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Committed | TransferState::Aborted)
    }

    /// Whether `to` is a legal successor of `self`
    pub fn can_advance_to(self, to: TransferState) -> bool {
        match to {
            TransferState::Aborted => self == TransferState::Started,
            _ => self.next() == Some(to),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferState::Started => "started",
            TransferState::FileMoved => "file-moved",
            TransferState::SourceManifestUpdated => "source-manifest-updated",
            TransferState::DestManifestUpdated => "dest-manifest-updated",
            TransferState::Committed => "committed",
            TransferState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
