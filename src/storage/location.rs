//! Storage Location
//!
//! A directory of save files plus the manifest describing it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{BaronError, Result, ResultExt};
use crate::manifest::{self, VerifyReport};

/// The three places a save file can live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Live,
    Backup,
    Archive,
}

impl LocationKind {
    pub const ALL: [LocationKind; 3] = [LocationKind::Live, LocationKind::Backup, LocationKind::Archive];

    /// Save file extension used in this location
    pub fn extension(self) -> &'static str {
        match self {
            LocationKind::Live => "zks",
            LocationKind::Backup => "bbb",
            LocationKind::Archive => "bba",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationKind::Live => "live",
            LocationKind::Backup => "backup",
            LocationKind::Archive => "archive",
        }
    }

    /// Whether `path` carries any save extension
    pub fn is_save_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                Self::ALL
                    .iter()
                    .any(|kind| ext.eq_ignore_ascii_case(kind.extension()))
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A save file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// A directory plus its manifest
#[derive(Debug, Clone)]
pub struct StorageLocation {
    kind: LocationKind,
    dir: PathBuf,
    manifest_path: PathBuf,
}

impl StorageLocation {
    pub fn new(kind: LocationKind, dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            dir: dir.into(),
            manifest_path: manifest_path.into(),
        }
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }

    /// "hero" → "hero.bbb" for the backup store
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(self.file_name(stem))
    }

    /// Ensure the directory and its manifest exist
    pub fn start(&self) -> Result<()> {
        let file_name = self
            .manifest_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BaronError::Config(format!("bad manifest path: {}", self.manifest_path.display()))
            })?;
        let parent = self.manifest_path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(&self.dir).at("create directory", &self.dir)?;
        manifest::start_manifest_at(parent, file_name)?;
        Ok(())
    }

    /// Save files in this location, most recently modified first
    pub fn list_saves(&self) -> Result<Vec<SaveFile>> {
        let mut saves = Vec::new();
        for entry in fs::read_dir(&self.dir).at("list directory", &self.dir)? {
            let entry = entry.at("list directory", &self.dir)?;
            let path = entry.path();
            let has_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(self.extension()))
                .unwrap_or(false);
            if !has_extension {
                continue;
            }
            let metadata = entry.metadata().at("stat", &path)?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            saves.push(SaveFile {
                name,
                modified: metadata.modified().at("stat", &path)?,
                path,
            });
        }
        saves.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(saves)
    }

    /// Bijection check between the directory and the manifest
    pub fn verify(&self) -> Result<VerifyReport> {
        manifest::verify(&self.dir, &self.manifest_path)
    }
}

/// Copy any file into `dir` as `<stem>.bak`, replacing an older copy
pub fn backup_misc_file(path: &Path, dir: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(BaronError::NotFound(path.to_path_buf()));
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BaronError::Validation(format!("no file stem in {}", path.display())))?;
    fs::create_dir_all(dir).at("create directory", dir)?;
    let dest = dir.join(format!("{}.{}", stem, super::MISC_BACKUP_EXTENSION));
    fs::copy(path, &dest).at("copy", path)?;
    tracing::debug!(from = %path.display(), to = %dest.display(), "file backed up");
    Ok(dest)
}
