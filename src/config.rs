//! Configuration for Baron Builder
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::container::Codec;

// =============================================================================
// Layout Constants
// =============================================================================

/// Tool directory created inside the live save directory
pub const TOOL_DIR: &str = "Baron_Builder";

/// Archived save files are moved here
pub const ARCHIVE_DIR: &str = "Archive";

/// Backed-up save files are copied here
pub const BACKUP_DIR: &str = "Backup";

/// Save files are unpacked and modified here
pub const WORKING_DIR: &str = "Working";

/// Manifest next to (one level above) the live save directory
pub const LIVE_MANIFEST: &str = "manifest.json";

/// Manifest inside the backup store
pub const BACKUP_MANIFEST: &str = "backup.json";

/// Manifest inside the archive store
pub const ARCHIVE_MANIFEST: &str = "archive.json";

/// Transfer journal inside the tool directory
pub const JOURNAL_FILENAME: &str = "transfer.journal";

/// Main configuration for a Baron Builder engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Location Configuration
    // -------------------------------------------------------------------------
    /// Live save directory (the game's "Saved Games" folder)
    /// Internal structure:
    ///   {live_dir}/
    ///     ├── *.zks
    ///     └── Baron_Builder/
    ///         ├── transfer.journal
    ///         ├── Archive/   (*.bba + archive.json)
    ///         ├── Backup/    (*.bbb + backup.json)
    ///         └── Working/   (unpacked containers)
    pub live_dir: PathBuf,

    /// Override for the live manifest path (default: `{live_dir}/../manifest.json`)
    pub live_manifest: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Codec every member is written with when archiving
    pub archive_codec: Codec,

    /// Compression level used when archiving (None = codec default)
    pub archive_level: Option<i64>,

    /// Codec used when rebuilding a live save from an archive
    pub restore_codec: Codec,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the transfer journal
    pub journal_sync_strategy: JournalSyncStrategy,

    // -------------------------------------------------------------------------
    // Safety Configuration
    // -------------------------------------------------------------------------
    /// Copy the live manifest to `Backup/<stem>.bak` when the engine opens
    pub backup_live_manifest: bool,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            live_dir: PathBuf::from("./Saved Games"),
            live_manifest: None,
            archive_codec: Codec::Bzip2,
            archive_level: Some(9),
            restore_codec: Codec::Deflated,
            journal_sync_strategy: JournalSyncStrategy::EveryWrite,
            backup_live_manifest: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Root of everything the tool creates
    pub fn tool_dir(&self) -> PathBuf {
        self.live_dir.join(TOOL_DIR)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.tool_dir().join(ARCHIVE_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.tool_dir().join(BACKUP_DIR)
    }

    pub fn working_dir(&self) -> PathBuf {
        self.tool_dir().join(WORKING_DIR)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.tool_dir().join(JOURNAL_FILENAME)
    }

    /// Resolve the live manifest path
    ///
    /// The live manifest lives one level above the live directory unless
    /// overridden. A live directory without a parent keeps it alongside.
    pub fn live_manifest_path(&self) -> PathBuf {
        if let Some(path) = &self.live_manifest {
            return path.clone();
        }
        let parent = self
            .live_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        parent.join(LIVE_MANIFEST)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the live save directory
    pub fn live_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.live_dir = path.into();
        self
    }

    /// Override the live manifest location
    pub fn live_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.live_manifest = Some(path.into());
        self
    }

    /// Set the codec and level used for archives
    pub fn archive_codec(mut self, codec: Codec, level: Option<i64>) -> Self {
        self.config.archive_codec = codec;
        self.config.archive_level = level;
        self
    }

    /// Set the codec used when restoring from an archive
    pub fn restore_codec(mut self, codec: Codec) -> Self {
        self.config.restore_codec = codec;
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync_strategy(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync_strategy = strategy;
        self
    }

    /// Enable or disable the `.bak` copy of the live manifest
    pub fn backup_live_manifest(mut self, enabled: bool) -> Self {
        self.config.backup_live_manifest = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
