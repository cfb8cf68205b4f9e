//! Transfer Module
//!
//! Operations a caller can run, and the state machine that moves one save
//! between two storage locations.
//!
//! ## Transfer Steps
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Move file    │──▶│ Source      │──▶│ Destination  │──▶│ Commit       │
//! │ (copy/pack)  │   │ manifest    │   │ manifest     │   │ (delete src) │
//! └──────────────┘   └─────────────┘   └──────────────┘   └──────────────┘
//!    FileMoved      SourceManifest-     DestManifest-        Committed
//!                      Updated            Updated
//! ```
//! Each reached state is journaled before the next step starts. Deleting a
//! source file only ever happens in the commit step.

mod state;
mod tracker;

use std::fmt;
use std::path::PathBuf;

use crate::manifest::ManifestEntry;

pub use state::{TransferKind, TransferState};
pub use tracker::Transfer;

/// Where a restore reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Backup,
    Archive,
}

impl RestoreSource {
    pub fn transfer_kind(self) -> TransferKind {
        match self {
            RestoreSource::Backup => TransferKind::RestoreBackup,
            RestoreSource::Archive => TransferKind::RestoreArchive,
        }
    }
}

/// The closed set of operations the engine executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Extract a live save into the working area
    Unpack { filename: String },
    /// Pack the working area back into the live save, codecs preserved
    Repack { filename: String },
    /// Move a live save into the archive store
    Archive { filename: String },
    /// Copy a live save into the backup store
    Backup { filename: String },
    /// Bring a save back into the live directory
    Restore { filename: String, from: RestoreSource },
}

impl Operation {
    pub fn filename(&self) -> &str {
        match self {
            Operation::Unpack { filename }
            | Operation::Repack { filename }
            | Operation::Archive { filename }
            | Operation::Backup { filename }
            | Operation::Restore { filename, .. } => filename,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Unpack { filename } => write!(f, "unpack {}", filename),
            Operation::Repack { filename } => write!(f, "repack {}", filename),
            Operation::Archive { filename } => write!(f, "archive {}", filename),
            Operation::Backup { filename } => write!(f, "backup {}", filename),
            Operation::Restore { filename, from } => {
                let source = match from {
                    RestoreSource::Backup => "backup",
                    RestoreSource::Archive => "archive",
                };
                write!(f, "restore {} from {}", filename, source)
            }
        }
    }
}

/// What a completed operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unpacked {
        working_dir: PathBuf,
        /// Member names in container order
        members: Vec<String>,
    },
    Repacked {
        path: PathBuf,
    },
    Transferred(TransferReport),
}

/// Summary of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub transfer_id: u64,
    pub kind: TransferKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Entries as merged into the destination manifest
    pub entries: Vec<ManifestEntry>,
    pub state: TransferState,
}
