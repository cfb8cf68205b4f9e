//! Storage Module
//!
//! The three storage locations a save file moves between.
//!
//! ## Layout
//! ```text
//! ┌──────────────────────┬────────────────────────────┬───────────┐
//! │ Location             │ Manifest                   │ Extension │
//! ├──────────────────────┼────────────────────────────┼───────────┤
//! │ Saved Games/         │ ../manifest.json           │ .zks      │
//! │ Baron_Builder/Backup │ Backup/backup.json         │ .bbb      │
//! │ Baron_Builder/Archive│ Archive/archive.json       │ .bba      │
//! └──────────────────────┴────────────────────────────┴───────────┘
//! ```
//! Miscellaneous file copies use `.bak` and are never tracked by a manifest.

mod location;

pub use location::{backup_misc_file, LocationKind, SaveFile, StorageLocation};

/// Extension for copies of non-save files (e.g. the live manifest)
pub const MISC_BACKUP_EXTENSION: &str = "bak";
