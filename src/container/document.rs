//! Document Layer
//!
//! Top-level key access to one JSON member of an unpacked container, with a
//! dirty flag so unchanged members are never rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{BaronError, Result, ResultExt};

/// UTF-8 byte order mark the game writes at the start of some members
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One parsed JSON member
#[derive(Debug)]
pub struct JsonDocument {
    path: PathBuf,
    data: Map<String, Value>,
    had_bom: bool,
    dirty: bool,
}

impl JsonDocument {
    /// Read and parse a JSON object from disk
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BaronError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(BaronError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let raw = fs::read(path).at("read document", path)?;
        let (had_bom, body) = match raw.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, raw.as_slice()),
        };

        let data = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(BaronError::Validation(format!(
                    "{} does not hold a JSON object",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(BaronError::Serialization(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
            had_bom,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Member file name (e.g. "player.json")
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.data.keys().map(|k| k.as_str())
    }

    /// Replace the value of an existing key
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        Self::check_key(key)?;
        match self.data.get_mut(key) {
            Some(slot) => {
                if *slot != value {
                    *slot = value;
                    self.dirty = true;
                }
                Ok(())
            }
            None => Err(BaronError::Validation(format!(
                "key {:?} does not exist in {}",
                key,
                self.name()
            ))),
        }
    }

    /// Insert a key that is not present yet
    pub fn add(&mut self, key: &str, value: Value) -> Result<()> {
        Self::check_key(key)?;
        if self.data.contains_key(key) {
            return Err(BaronError::Validation(format!(
                "key {:?} already exists in {}",
                key,
                self.name()
            )));
        }
        self.data.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    /// Remove an existing key, returning its value
    pub fn delete(&mut self, key: &str) -> Result<Value> {
        Self::check_key(key)?;
        // shift_remove keeps the remaining keys in file order
        match self.data.shift_remove(key) {
            Some(value) => {
                self.dirty = true;
                Ok(value)
            }
            None => Err(BaronError::Validation(format!(
                "key {:?} does not exist in {}",
                key,
                self.name()
            ))),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write back to disk if anything changed
    ///
    /// Returns whether a write happened.
    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let body = serde_json::to_vec(&self.data)
            .map_err(|e| BaronError::Serialization(e.to_string()))?;
        let mut out = Vec::with_capacity(body.len() + UTF8_BOM.len());
        if self.had_bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(&body);

        fs::write(&self.path, out).at("write document", &self.path)?;
        self.dirty = false;
        tracing::debug!(document = %self.path.display(), "document saved");
        Ok(true)
    }

    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(BaronError::Validation("empty key".to_string()));
        }
        Ok(())
    }
}
