//! Manifest Store
//!
//! Loads, mutates and persists one manifest file.
//!
//! ## Write Policy
//! - Loaded lazily on first access
//! - Mutations only touch the in-memory copy and set a dirty flag
//! - `flush` writes through a temporary file and skips clean manifests

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::container::replace_file;
use crate::error::{BaronError, Result, ResultExt};
use crate::storage::LocationKind;

use super::{stem_of, Manifest, ManifestEntry};

/// Lazily loaded manifest with change tracking
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Option<Manifest>,
    dirty: bool,
}

impl ManifestStore {
    /// Bind to a manifest file without reading it yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            manifest: None,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Current contents (loads on first call)
    pub fn manifest(&mut self) -> Result<&Manifest> {
        self.loaded().map(|m| &*m)
    }

    /// Copies of every entry matching `filename`'s stem
    pub fn extract(&mut self, filename: &str) -> Result<Vec<ManifestEntry>> {
        Ok(self.loaded()?.find_matching(filename))
    }

    /// Drop every entry matching `filename`'s stem; empty result is not an error
    pub fn remove(&mut self, filename: &str) -> Result<Vec<ManifestEntry>> {
        let removed = self.loaded()?.remove_matching(filename);
        if !removed.is_empty() {
            self.dirty = true;
        }
        Ok(removed)
    }

    /// Merge entries with monotonic versions; returns whether anything changed
    pub fn merge(&mut self, entries: &[ManifestEntry]) -> Result<bool> {
        for entry in entries {
            if let Some(problem) = entry.shape_error() {
                return Err(BaronError::Validation(problem));
            }
        }
        let changed = self.loaded()?.merge(entries);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Persist pending changes; returns whether a write happened
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(manifest) = &self.manifest {
            save_manifest(&self.path, manifest)?;
        }
        self.dirty = false;
        Ok(true)
    }

    /// Throw away the cached copy and any unflushed changes
    pub fn discard(&mut self) {
        self.manifest = None;
        self.dirty = false;
    }

    fn loaded(&mut self) -> Result<&mut Manifest> {
        if self.manifest.is_none() {
            self.manifest = Some(load_manifest(&self.path)?);
        }
        self.manifest
            .as_mut()
            .ok_or_else(|| BaronError::NotFound(self.path.clone()))
    }
}

// =============================================================================
// Free-standing operations (one load/save per call)
// =============================================================================

/// Read and validate a manifest
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    if !path.is_file() {
        return Err(BaronError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read(path).at("read manifest", path)?;
    let body = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&raw);

    let manifest: Manifest =
        serde_json::from_slice(body).map_err(|e| BaronError::ManifestCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    manifest
        .validate()
        .map_err(|reason| BaronError::ManifestCorrupt {
            path: path.to_path_buf(),
            reason,
        })?;
    Ok(manifest)
}

/// Write a manifest through a temporary file in the same directory
pub fn save_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let bytes =
        serde_json::to_vec(manifest).map_err(|e| BaronError::Serialization(e.to_string()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BaronError::Validation(format!("bad manifest path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp, bytes).at("write manifest", &temp)?;
    replace_file(&temp, path)?;
    tracing::debug!(manifest = %path.display(), entries = manifest.files.len(), "manifest written");
    Ok(())
}

/// Create `dir` and an empty manifest inside it if either is missing
///
/// An existing manifest is never overwritten. Returns the manifest path.
pub fn start_manifest_at(dir: &Path, manifest_filename: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).at("create directory", dir)?;
    let path = dir.join(manifest_filename);
    if !path.exists() {
        save_manifest(&path, &Manifest::new())?;
        tracing::info!(manifest = %path.display(), "manifest started");
    }
    Ok(path)
}

/// Copies of the entries matching `filename`'s stem
pub fn extract_entry(manifest_path: &Path, filename: &str) -> Result<Vec<ManifestEntry>> {
    ManifestStore::new(manifest_path).extract(filename)
}

/// Remove the entries matching `filename`'s stem and persist
pub fn remove_entry(manifest_path: &Path, filename: &str) -> Result<Vec<ManifestEntry>> {
    let mut store = ManifestStore::new(manifest_path);
    let removed = store.remove(filename)?;
    store.flush()?;
    Ok(removed)
}

/// Merge entries and persist (skipped when nothing changed)
pub fn merge_entries(manifest_path: &Path, entries: &[ManifestEntry]) -> Result<bool> {
    let mut store = ManifestStore::new(manifest_path);
    let changed = store.merge(entries)?;
    store.flush()?;
    Ok(changed)
}

// =============================================================================
// Verify
// =============================================================================

/// Outcome of a bijection check between a directory and its manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Entries with no save file of the same stem on disk
    pub missing_files: Vec<String>,

    /// Save files on disk with no entry of the same stem
    pub untracked_files: Vec<String>,

    /// Stems listed by more than one entry
    pub ambiguous_entries: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing_files.is_empty()
            && self.untracked_files.is_empty()
            && self.ambiguous_entries.is_empty()
    }
}

/// Check that save files in `dir` and entries in the manifest pair up one to one
///
/// Only files carrying a save extension (`zks`, `bbb`, `bba`) count, so the
/// manifest itself and `.bak` copies are ignored. Violations are reported,
/// never repaired.
pub fn verify(dir: &Path, manifest_path: &Path) -> Result<VerifyReport> {
    if !dir.is_dir() {
        return Err(BaronError::NotFound(dir.to_path_buf()));
    }
    let manifest = load_manifest(manifest_path)?;

    let mut disk_stems = HashSet::new();
    let mut disk_files = Vec::new();
    for entry in fs::read_dir(dir).at("list directory", dir)? {
        let entry = entry.at("list directory", dir)?;
        let path = entry.path();
        if !path.is_file() || !LocationKind::is_save_file(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            disk_stems.insert(stem_of(name).to_string());
            disk_files.push(name.to_string());
        }
    }
    disk_files.sort();

    let mut report = VerifyReport::default();
    let mut entry_stems = HashSet::new();
    for entry in &manifest.files {
        if !entry_stems.insert(entry.stem().to_string()) {
            report.ambiguous_entries.push(entry.filename.clone());
        }
        if !disk_stems.contains(entry.stem()) {
            report.missing_files.push(entry.filename.clone());
        }
    }
    for name in disk_files {
        if !entry_stems.contains(stem_of(&name)) {
            report.untracked_files.push(name);
        }
    }

    if !report.is_ok() {
        tracing::warn!(
            dir = %dir.display(),
            missing = report.missing_files.len(),
            untracked = report.untracked_files.len(),
            ambiguous = report.ambiguous_entries.len(),
            "manifest out of step with directory"
        );
    }
    Ok(report)
}
