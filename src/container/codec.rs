//! Codec Table
//!
//! Records the compression method of every container member so a repack
//! reproduces the original layout.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zip::{CompressionMethod, ZipArchive};

use crate::error::{BaronError, Result, ResultExt};

/// Compression methods a save container member may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    Stored,
    Deflated,
    Bzip2,
    Lzma,
}

impl Codec {
    /// Map a zip compression method onto the allow-list
    ///
    /// Anything outside {stored, deflated, bzip2, lzma} is rejected rather
    /// than approximated.
    pub fn from_method(member: &str, method: CompressionMethod) -> Result<Self> {
        match method {
            CompressionMethod::Stored => Ok(Codec::Stored),
            CompressionMethod::Deflated => Ok(Codec::Deflated),
            CompressionMethod::Bzip2 => Ok(Codec::Bzip2),
            CompressionMethod::Lzma => Ok(Codec::Lzma),
            other => Err(BaronError::CodecUnknown {
                member: member.to_string(),
                method: format!("{:?}", other),
            }),
        }
    }

    pub fn method(self) -> CompressionMethod {
        match self {
            Codec::Stored => CompressionMethod::Stored,
            Codec::Deflated => CompressionMethod::Deflated,
            Codec::Bzip2 => CompressionMethod::Bzip2,
            Codec::Lzma => CompressionMethod::Lzma,
        }
    }

    /// Whether the zip writer can compress fresh data with this codec
    ///
    /// LZMA members can only be carried over raw from an existing container.
    pub fn is_writable(self) -> bool {
        !matches!(self, Codec::Lzma)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Codec::Stored => "stored",
            Codec::Deflated => "deflated",
            Codec::Bzip2 => "bzip2",
            Codec::Lzma => "lzma",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Codec {
    type Err = BaronError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stored" | "store" => Ok(Codec::Stored),
            "deflated" | "deflate" => Ok(Codec::Deflated),
            "bzip2" | "bz2" => Ok(Codec::Bzip2),
            "lzma" => Ok(Codec::Lzma),
            _ => Err(BaronError::Validation(format!("unknown codec: {}", s))),
        }
    }
}

/// Per-member codec record for one container
///
/// Keeps the original member order so a repack writes members in the same
/// sequence the game wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecTable {
    codecs: BTreeMap<String, Codec>,
    order: Vec<String>,
}

impl CodecTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the codec of every member from a container's central directory
    ///
    /// Nothing is extracted; this also recovers the table from an untouched
    /// original after the process that unpacked it is gone.
    pub fn capture(container_path: &Path) -> Result<Self> {
        let file = File::open(container_path).at("open container", container_path)?;
        let mut archive = ZipArchive::new(file).at("read container", container_path)?;
        Self::from_archive(&mut archive, container_path)
    }

    pub(crate) fn from_archive<R: std::io::Read + std::io::Seek>(
        archive: &mut ZipArchive<R>,
        container_path: &Path,
    ) -> Result<Self> {
        let mut table = Self::new();
        for i in 0..archive.len() {
            // Raw access: an unknown method must reach the allow-list, not the decompressor
            let member = archive.by_index_raw(i).at("read member", container_path)?;
            if member.is_dir() {
                continue;
            }
            let name = member.name().to_string();
            let codec = Codec::from_method(&name, member.compression())?;
            table.insert(name, codec);
        }
        Ok(table)
    }

    /// Register a member (new members are appended to the order)
    pub fn insert(&mut self, member: impl Into<String>, codec: Codec) {
        let member = member.into();
        if self.codecs.insert(member.clone(), codec).is_none() {
            self.order.push(member);
        }
    }

    pub fn remove(&mut self, member: &str) -> Option<Codec> {
        let codec = self.codecs.remove(member)?;
        self.order.retain(|m| m != member);
        Some(codec)
    }

    pub fn get(&self, member: &str) -> Option<Codec> {
        self.codecs.get(member).copied()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.codecs.contains_key(member)
    }

    /// Position of a member in the original container (None if new)
    pub fn position(&self, member: &str) -> Option<usize> {
        self.order.iter().position(|m| m == member)
    }

    /// Members in original container order
    pub fn members(&self) -> impl Iterator<Item = (&str, Codec)> + '_ {
        self.order
            .iter()
            .filter_map(move |m| self.codecs.get(m).map(|c| (m.as_str(), *c)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
