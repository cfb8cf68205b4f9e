//! Container Module
//!
//! Save containers are zip archives holding the game's JSON documents.
//!
//! ## Responsibilities
//! - Record every member's codec at unpack time (`CodecTable`)
//! - Extract members into a working directory
//! - Expose the supported documents for in-memory edits
//! - Repack with the original codecs and replace the save atomically
//! - Build maximally compressed archive copies
//!
//! ## Lifecycle
//! ```text
//!   open ──▶ unpack ──▶ load_documents ──▶ (edit) ──▶ repack ──▶ close
//!                                   └────────────▶ archive_to ──▶ close
//! ```

mod codec;
mod document;
mod engine;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use codec::{Codec, CodecTable};
pub use document::JsonDocument;
pub use engine::{archive, repack, unpack, Unpacked};
pub(crate) use engine::{file_stem, replace_file};

use crate::error::{BaronError, Result, ResultExt};

/// JSON members the document layer knows how to load
pub const SUPPORTED_DOCUMENTS: [&str; 4] = [
    "header.json",
    "party.json",
    "player.json",
    "statistic.json",
];

/// One save file being edited
///
/// Owned by the caller that opened it. Dropping or closing it discards
/// every loaded document.
#[derive(Debug)]
pub struct SaveContainer {
    /// Absolute path of the save file
    path: PathBuf,

    /// Present once `unpack` succeeded
    unpacked: Option<Unpacked>,

    /// Loaded documents keyed by member name
    documents: BTreeMap<String, JsonDocument>,

    /// Set when an unpack failed; the container must be reopened
    failed: bool,
}

impl SaveContainer {
    /// Open a save file for editing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(BaronError::Validation("empty save file path".to_string()));
        }
        if !path.exists() {
            return Err(BaronError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(BaronError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let path = fs::canonicalize(path).at("resolve save file", path)?;

        Ok(Self {
            path,
            unpacked: None,
            documents: BTreeMap::new(),
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension; also the working directory name
    pub fn stem(&self) -> Result<&str> {
        file_stem(&self.path)
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.unpacked.as_ref().map(|u| u.working_dir.as_path())
    }

    pub fn codecs(&self) -> Option<&CodecTable> {
        self.unpacked.as_ref().map(|u| &u.codecs)
    }

    /// Mutable table, for registering members added to the working directory
    pub fn codecs_mut(&mut self) -> Option<&mut CodecTable> {
        self.unpacked.as_mut().map(|u| &mut u.codecs)
    }

    pub fn is_unpacked(&self) -> bool {
        self.unpacked.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Extract into `scratch_root/<stem>`
    pub fn unpack(&mut self, scratch_root: &Path) -> Result<&Path> {
        if self.failed {
            return Err(BaronError::Validation(format!(
                "{} failed to unpack earlier; reopen it",
                self.path.display()
            )));
        }
        self.documents.clear();
        match unpack(&self.path, scratch_root) {
            Ok(unpacked) => {
                let unpacked = self.unpacked.insert(unpacked);
                Ok(unpacked.working_dir.as_path())
            }
            Err(e) => {
                self.failed = true;
                self.unpacked = None;
                Err(e)
            }
        }
    }

    /// Load every supported document present in the working directory
    ///
    /// Returns how many were loaded.
    pub fn load_documents(&mut self) -> Result<usize> {
        let working_dir = self.require_unpacked()?.working_dir.clone();
        let mut loaded = 0;
        for name in SUPPORTED_DOCUMENTS {
            let path = working_dir.join(name);
            if !path.is_file() || self.documents.contains_key(name) {
                continue;
            }
            self.documents
                .insert(name.to_string(), JsonDocument::open(&path)?);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Load one member by name (any JSON member, not only the supported four)
    pub fn load_document(&mut self, name: &str) -> Result<&mut JsonDocument> {
        let working_dir = self.require_unpacked()?.working_dir.clone();
        if !self.documents.contains_key(name) {
            let document = JsonDocument::open(&working_dir.join(name))?;
            self.documents.insert(name.to_string(), document);
        }
        self.documents
            .get_mut(name)
            .ok_or_else(|| BaronError::NotFound(working_dir.join(name)))
    }

    pub fn document(&self, name: &str) -> Option<&JsonDocument> {
        self.documents.get(name)
    }

    pub fn document_mut(&mut self, name: &str) -> Option<&mut JsonDocument> {
        self.documents.get_mut(name)
    }

    /// Whether any loaded document has unsaved changes
    pub fn is_changed(&self) -> bool {
        self.documents.values().any(|d| d.is_dirty())
    }

    /// Write dirty documents back to the working directory
    pub fn save_documents(&mut self) -> Result<usize> {
        let mut written = 0;
        for document in self.documents.values_mut() {
            if document.save()? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Save documents, then replace the save file with a repacked container
    pub fn repack(&mut self) -> Result<()> {
        self.save_documents()?;
        let unpacked = self.require_unpacked()?;
        repack(&unpacked.working_dir, &self.path, &unpacked.codecs)
    }

    /// Save documents, then write an archive copy into `archive_dir`
    pub fn archive_to(
        &mut self,
        archive_dir: &Path,
        codec: Codec,
        level: Option<i64>,
    ) -> Result<PathBuf> {
        self.save_documents()?;
        let unpacked = self.require_unpacked()?;
        archive(&unpacked.working_dir, archive_dir, codec, level)
    }

    /// Discard documents; optionally remove the working directory
    ///
    /// A working directory is only removed when this container created it.
    pub fn close(mut self, remove_working_dir: bool) -> Result<()> {
        self.documents.clear();
        if let Some(unpacked) = self.unpacked.take() {
            if remove_working_dir && unpacked.created && unpacked.working_dir.is_dir() {
                fs::remove_dir_all(&unpacked.working_dir)
                    .at("remove working directory", &unpacked.working_dir)?;
                tracing::debug!(working_dir = %unpacked.working_dir.display(), "working directory removed");
            }
        }
        Ok(())
    }

    fn require_unpacked(&self) -> Result<&Unpacked> {
        self.unpacked.as_ref().ok_or_else(|| {
            BaronError::Validation(format!("{} is not unpacked", self.path.display()))
        })
    }
}
