//! Container Engine
//!
//! Unpacks a save container into a working directory and packs it back.
//!
//! ## Repack Pipeline
//! ```text
//!   working_dir/*  ──plan──▶  [member, codec, raw?]  ──write──▶  .name.repack
//!                                                                    │
//!                                   original.zks  ◀──replace─────────┘
//! ```
//! Members whose bytes and codec are unchanged are copied raw from the
//! original container; everything else is compressed with the codec the
//! table recorded at unpack time.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{BaronError, Result, ResultExt};
use crate::storage::LocationKind;

use super::{Codec, CodecTable};

/// Result of a successful unpack
#[derive(Debug, Clone)]
pub struct Unpacked {
    /// Directory the members were extracted into
    pub working_dir: PathBuf,

    /// Codec of every member, in container order
    pub codecs: CodecTable,

    /// Whether this unpack created `working_dir` (false when it was reused)
    pub created: bool,
}

/// One member scheduled for writing
#[derive(Debug)]
struct PlannedMember {
    name: String,
    source: PathBuf,
    codec: Codec,
    raw_copy: bool,
}

// =============================================================================
// Unpack
// =============================================================================

/// Extract every member of `container_path` into `scratch_root/<stem>`
///
/// The working directory is created if absent and reused if present.
pub fn unpack(container_path: &Path, scratch_root: &Path) -> Result<Unpacked> {
    check_regular_file(container_path)?;

    let stem = file_stem(container_path)?;
    let working_dir = scratch_root.join(stem);
    let created = !working_dir.is_dir();
    fs::create_dir_all(&working_dir).at("create working directory", &working_dir)?;

    let codecs = match extract_all(container_path, &working_dir) {
        Ok(codecs) => codecs,
        Err(e) => {
            // No partial table or half-extracted directory is kept
            if created {
                let _ = fs::remove_dir_all(&working_dir);
            }
            return Err(e);
        }
    };

    tracing::info!(
        container = %container_path.display(),
        working_dir = %working_dir.display(),
        members = codecs.len(),
        reused = !created,
        "container unpacked"
    );

    Ok(Unpacked {
        working_dir,
        codecs,
        created,
    })
}

// =============================================================================
// Repack
// =============================================================================

/// Pack `working_dir` back into `original_path` using the recorded codecs
///
/// Every file in the working directory must have a codec entry. The new
/// container is fully written to a temporary file inside `working_dir`
/// before the original is replaced, so a failed write leaves the original
/// untouched.
pub fn repack(working_dir: &Path, original_path: &Path, codecs: &CodecTable) -> Result<()> {
    let temp_path = working_dir.join(temp_name(original_path, "repack")?);
    let files = collect_members(working_dir, &[&temp_path])?;

    // Open the original for raw copies of unchanged members
    let mut original = match File::open(original_path) {
        Ok(file) => Some(ZipArchive::new(file).at("read container", original_path)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(BaronError::IoAt {
                action: "open container",
                path: original_path.to_path_buf(),
                source,
            })
        }
    };

    let mut plan = Vec::with_capacity(files.len());
    for (name, source) in files {
        let codec = codecs
            .get(&name)
            .ok_or_else(|| BaronError::CodecMissing { member: name.clone() })?;
        let raw_copy = match original.as_mut() {
            Some(archive) => is_unchanged(archive, original_path, &name, &source, codec)?,
            None => false,
        };
        if !raw_copy && !codec.is_writable() {
            return Err(BaronError::CodecUnwritable { member: name, codec });
        }
        plan.push(PlannedMember {
            name,
            source,
            codec,
            raw_copy,
        });
    }
    plan.sort_by_key(|m| (codecs.position(&m.name).unwrap_or(usize::MAX), m.name.clone()));

    if let Err(e) = write_container(&temp_path, &plan, original.as_mut(), original_path, None) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(original);

    replace_file(&temp_path, original_path)?;

    tracing::info!(
        container = %original_path.display(),
        members = plan.len(),
        raw_copies = plan.iter().filter(|m| m.raw_copy).count(),
        "container repacked"
    );
    Ok(())
}

// =============================================================================
// Archive
// =============================================================================

/// Pack `working_dir` into `archive_dir/<stem>.bba` with a single codec
///
/// The codec table is ignored. The live save is never touched; an existing
/// archive with the same name is replaced only after the write succeeded.
pub fn archive(
    working_dir: &Path,
    archive_dir: &Path,
    codec: Codec,
    level: Option<i64>,
) -> Result<PathBuf> {
    if !codec.is_writable() {
        return Err(BaronError::Config(format!(
            "{} cannot be used as the archive codec",
            codec
        )));
    }
    if !working_dir.is_dir() {
        return Err(BaronError::NotFound(working_dir.to_path_buf()));
    }

    let stem = working_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BaronError::Validation(format!("bad working directory: {}", working_dir.display()))
        })?;
    fs::create_dir_all(archive_dir).at("create archive directory", archive_dir)?;

    let archive_path = archive_dir.join(format!("{}.{}", stem, LocationKind::Archive.extension()));
    let temp_path = archive_dir.join(temp_name(&archive_path, "tmp")?);
    let files = collect_members(working_dir, &[])?;

    let mut plan: Vec<PlannedMember> = files
        .into_iter()
        .map(|(name, source)| PlannedMember {
            name,
            source,
            codec,
            raw_copy: false,
        })
        .collect();
    plan.sort_by(|a, b| a.name.cmp(&b.name));

    if let Err(e) = write_container::<File>(&temp_path, &plan, None, &archive_path, level) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    replace_file(&temp_path, &archive_path)?;

    tracing::info!(
        archive = %archive_path.display(),
        codec = %codec,
        members = plan.len(),
        "container archived"
    );
    Ok(archive_path)
}

// =============================================================================
// Private Helpers
// =============================================================================

fn check_regular_file(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(BaronError::Validation("empty container path".to_string()));
    }
    if !path.exists() {
        return Err(BaronError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(BaronError::Validation(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(())
}

/// Record codecs, then extract every member below `working_dir`
fn extract_all(container_path: &Path, working_dir: &Path) -> Result<CodecTable> {
    let file = File::open(container_path).at("open container", container_path)?;
    let mut archive = ZipArchive::new(file).at("read container", container_path)?;

    // Reject unknown codecs before a single byte is extracted
    let codecs = CodecTable::from_archive(&mut archive, container_path)?;

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).at("read member", container_path)?;
        let relative = member
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                BaronError::Validation(format!(
                    "member {:?} in {} escapes the working directory",
                    member.name(),
                    container_path.display()
                ))
            })?;
        let out_path = working_dir.join(&relative);

        if member.is_dir() {
            fs::create_dir_all(&out_path).at("create directory", &out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).at("create directory", parent)?;
        }

        let mut out = File::create(&out_path).at("create member file", &out_path)?;
        io::copy(&mut member, &mut out).at("extract member", &out_path)?;
        tracing::debug!(member = member.name(), bytes = member.size(), "member extracted");
    }
    Ok(codecs)
}

pub(crate) fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BaronError::Validation(format!("no file stem in {}", path.display())))
}

/// Suffixes of the temporary files written next to containers and manifests
const TEMP_SUFFIXES: [&str; 4] = ["repack", "tmp", "restore", "swap"];

/// Whether `name` is one of this crate's ".<file>.<suffix>" temporaries
fn is_temp_file(name: &str) -> bool {
    name.starts_with('.')
        && name
            .rsplit_once('.')
            .is_some_and(|(_, suffix)| TEMP_SUFFIXES.contains(&suffix))
}

/// ".hero.zks.repack" for "hero.zks"
fn temp_name(path: &Path, suffix: &str) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BaronError::Validation(format!("no file name in {}", path.display())))?;
    Ok(format!(".{}.{}", name, suffix))
}

/// Every regular file under `dir` as (member name, path), minus `skip`
fn collect_members(dir: &Path, skip: &[&Path]) -> Result<Vec<(String, PathBuf)>> {
    let mut members = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed"));
            BaronError::IoAt {
                action: "list working directory",
                path: dir.to_path_buf(),
                source,
            }
        })?;
        if !entry.file_type().is_file() || skip.contains(&entry.path()) {
            continue;
        }
        // Leftovers of an interrupted repack or archive are not members
        if entry.depth() == 1 && entry.file_name().to_str().is_some_and(is_temp_file) {
            tracing::debug!(file = %entry.path().display(), "stale temporary skipped");
            continue;
        }
        let relative = entry.path().strip_prefix(dir).map_err(|_| {
            BaronError::Validation(format!("{} is outside {}", entry.path().display(), dir.display()))
        })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        members.push((name, entry.path().to_path_buf()));
    }
    Ok(members)
}

/// Whether a working file still matches the original member byte for byte
fn is_unchanged<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    name: &str,
    source: &Path,
    codec: Codec,
) -> Result<bool> {
    let Some(index) = archive.index_for_name(name) else {
        return Ok(false);
    };
    let (crc, size, original_codec) = {
        let member = archive
            .by_index_raw(index)
            .map_err(|e| BaronError::zip(archive_path, e))?;
        (member.crc32(), member.size(), Codec::from_method(name, member.compression())?)
    };
    if original_codec != codec {
        return Ok(false);
    }

    let bytes = fs::read(source).at("read member file", source)?;
    Ok(bytes.len() as u64 == size && crc32fast::hash(&bytes) == crc)
}

fn write_container<R: Read + Seek>(
    out_path: &Path,
    plan: &[PlannedMember],
    mut original: Option<&mut ZipArchive<R>>,
    original_path: &Path,
    level: Option<i64>,
) -> Result<()> {
    let file = File::create(out_path).at("create container", out_path)?;
    let mut writer = ZipWriter::new(file);

    for member in plan {
        if member.raw_copy {
            if let Some(archive) = original.as_mut() {
                let index = archive.index_for_name(&member.name).ok_or_else(|| {
                    BaronError::zip(original_path, zip::result::ZipError::FileNotFound)
                })?;
                let source = archive.by_index_raw(index).at("read member", original_path)?;
                writer.raw_copy_file(source).at("copy member", out_path)?;
                tracing::debug!(member = %member.name, codec = %member.codec, "member copied raw");
                continue;
            }
        }

        let mut options = SimpleFileOptions::default().compression_method(member.codec.method());
        if member.codec != Codec::Stored {
            options = options.compression_level(level);
        }
        writer
            .start_file(member.name.as_str(), options)
            .at("start member", out_path)?;
        let mut source = File::open(&member.source).at("open member file", &member.source)?;
        io::copy(&mut source, &mut writer).at("compress member", &member.source)?;
        tracing::debug!(member = %member.name, codec = %member.codec, "member compressed");
    }

    let file = writer.finish().at("finish container", out_path)?;
    file.sync_all().at("sync container", out_path)?;
    Ok(())
}

/// Move `temp` over `dest` in one rename
///
/// `dest` is never deleted first: on failure it is left as it was and
/// `temp` is removed.
pub(crate) fn replace_file(temp: &Path, dest: &Path) -> Result<()> {
    let rename_error = match fs::rename(temp, dest) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if rename_error.kind() != io::ErrorKind::CrossesDevices {
        let _ = fs::remove_file(temp);
        return Err(BaronError::IoAt {
            action: "replace file",
            path: dest.to_path_buf(),
            source: rename_error,
        });
    }

    // Different filesystems: stage a copy beside `dest`, then rename there
    let result = temp_name(dest, "swap").and_then(|name| {
        let staged = dest.with_file_name(name);
        let moved = fs::copy(temp, &staged)
            .and_then(|_| fs::rename(&staged, dest))
            .at("replace file", dest);
        if moved.is_err() {
            let _ = fs::remove_file(&staged);
        }
        moved
    });
    let _ = fs::remove_file(temp);
    result
}
