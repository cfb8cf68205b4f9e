//! Manifest types
//!
//! The ledger format shared with the game:
//! `{"Version": <int>, "Files": [{"Filename": "<basename>", "Version": <int>}, ...]}`

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One save file listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Basename only, never a path
    #[serde(rename = "Filename")]
    pub filename: String,

    #[serde(rename = "Version")]
    pub version: u64,
}

impl ManifestEntry {
    pub fn new(filename: impl Into<String>, version: u64) -> Self {
        Self {
            filename: filename.into(),
            version,
        }
    }

    /// Filename without extension
    pub fn stem(&self) -> &str {
        stem_of(&self.filename)
    }

    /// Extension-insensitive match ("save1.bba" matches "save1.zks")
    pub fn matches(&self, filename: &str) -> bool {
        self.stem() == stem_of(filename)
    }

    /// Same entry under a different extension
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            filename: format!("{}.{}", self.stem(), extension),
            version: self.version,
        }
    }

    /// Problem with this entry's shape, if any
    pub(crate) fn shape_error(&self) -> Option<String> {
        if self.filename.is_empty() {
            return Some("entry with empty Filename".to_string());
        }
        if self.filename.contains('/') || self.filename.contains('\\') {
            return Some(format!("Filename {:?} contains a path separator", self.filename));
        }
        if self.version == 0 {
            return Some(format!("Filename {:?} has Version 0", self.filename));
        }
        None
    }
}

/// A storage location's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Version")]
    pub version: u64,

    #[serde(rename = "Files")]
    pub files: Vec<ManifestEntry>,

    /// Top-level keys owned by the game; carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    /// Fresh manifest: `{"Version": 1, "Files": []}`
    pub fn new() -> Self {
        Self {
            version: 1,
            files: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Check every invariant; returns the first violation
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.version == 0 {
            return Err("manifest Version is 0".to_string());
        }
        let mut seen = HashSet::new();
        for entry in &self.files {
            if let Some(problem) = entry.shape_error() {
                return Err(problem);
            }
            if entry.version > self.version {
                return Err(format!(
                    "Filename {:?} has Version {} above manifest Version {}",
                    entry.filename, entry.version, self.version
                ));
            }
            if !seen.insert(entry.filename.as_str()) {
                return Err(format!("Filename {:?} is listed twice", entry.filename));
            }
        }
        Ok(())
    }

    /// Copies of every entry whose stem matches `filename`'s stem
    pub fn find_matching(&self, filename: &str) -> Vec<ManifestEntry> {
        self.files
            .iter()
            .filter(|e| e.matches(filename))
            .cloned()
            .collect()
    }

    /// Remove and return every entry whose stem matches `filename`'s stem
    pub fn remove_matching(&mut self, filename: &str) -> Vec<ManifestEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|e| e.matches(filename));
        self.files = kept;
        removed
    }

    /// Fold entries in with monotonic versions
    ///
    /// Existing filenames only ever move their Version up; new filenames
    /// are appended. The manifest Version follows the highest incoming
    /// Version. Returns whether anything changed.
    pub fn merge(&mut self, entries: &[ManifestEntry]) -> bool {
        let mut changed = false;
        for incoming in entries {
            match self
                .files
                .iter_mut()
                .find(|e| e.filename == incoming.filename)
            {
                Some(existing) => {
                    if incoming.version > existing.version {
                        existing.version = incoming.version;
                        changed = true;
                    }
                }
                None => {
                    self.files.push(incoming.clone());
                    changed = true;
                }
            }
            if incoming.version > self.version {
                self.version = incoming.version;
                changed = true;
            }
        }
        changed
    }

    pub fn contains_stem(&self, filename: &str) -> bool {
        self.files.iter().any(|e| e.matches(filename))
    }
}

/// Filename without its last extension
pub fn stem_of(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}
