//! Engine Module
//!
//! Coordinates the container engine, the three storage locations and the
//! transfer journal.
//!
//! ## Responsibilities
//! - Lay out the tool directories and start the store manifests
//! - Recover the journal and surface transfers that never committed
//! - Execute the closed set of operations in `transfer::Operation`
//! - Check every storage location against its manifest

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::container::{self, CodecTable, SaveContainer};
use crate::error::{BaronError, Result, ResultExt};
use crate::journal::{JournalRecovery, JournalWriter, PendingTransfer};
use crate::manifest::{self, ManifestEntry, VerifyReport};
use crate::storage::{backup_misc_file, LocationKind, SaveFile, StorageLocation};
use crate::transfer::{
    Operation, Outcome, RestoreSource, Transfer, TransferKind, TransferReport, TransferState,
};

/// Consistency of every storage location plus unfinished transfers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub locations: Vec<(LocationKind, VerifyReport)>,
    pub pending: Vec<PendingTransfer>,
}

impl ConsistencyReport {
    pub fn is_ok(&self) -> bool {
        self.pending.is_empty() && self.locations.iter().all(|(_, r)| r.is_ok())
    }
}

/// Checked inputs of a transfer
struct Preflight {
    /// Source file name, e.g. "hero.zks"; manifest lookups strip its extension once
    source_name: String,
    source_path: PathBuf,
    destination_path: PathBuf,
    entries: Vec<ManifestEntry>,
}

/// Owns the storage locations and the journal
///
/// Single-threaded: every operation runs to completion before the next one
/// starts. Nothing locks the save files against other processes.
pub struct Engine {
    config: Config,
    live: StorageLocation,
    backup: StorageLocation,
    archive: StorageLocation,
    journal: JournalWriter,
    /// Transfers found unfinished when the journal was recovered
    pending: Vec<PendingTransfer>,
    next_transfer_id: u64,
}

impl Engine {
    /// Open the engine over `config.live_dir`
    ///
    /// On startup:
    /// 1. Require the live directory
    /// 2. Create the tool, backup, archive and working directories
    /// 3. Start the backup and archive manifests (never overwritten)
    /// 4. Copy the live manifest into the backup store as `.bak`
    /// 5. Recover the journal, keeping it only if a transfer is unfinished
    pub fn open(config: Config) -> Result<Self> {
        if !config.live_dir.is_dir() {
            return Err(BaronError::NotFound(config.live_dir.clone()));
        }

        // Step 1: Lay out directories and manifests
        let live = StorageLocation::new(
            LocationKind::Live,
            &config.live_dir,
            config.live_manifest_path(),
        );
        let backup_dir = config.backup_dir();
        let backup = StorageLocation::new(
            LocationKind::Backup,
            &backup_dir,
            backup_dir.join(crate::config::BACKUP_MANIFEST),
        );
        let archive_dir = config.archive_dir();
        let archive = StorageLocation::new(
            LocationKind::Archive,
            &archive_dir,
            archive_dir.join(crate::config::ARCHIVE_MANIFEST),
        );
        backup.start()?;
        archive.start()?;
        let working_dir = config.working_dir();
        fs::create_dir_all(&working_dir).at("create working directory", &working_dir)?;

        // Step 2: Keep a copy of the live manifest
        if !live.manifest_path().is_file() {
            tracing::warn!(
                manifest = %live.manifest_path().display(),
                "live manifest missing; transfers touching the live directory will fail"
            );
        } else if config.backup_live_manifest {
            backup_misc_file(live.manifest_path(), backup.dir())?;
        }

        // Step 3: Recover the journal
        let journal_path = config.journal_path();
        let (entries, recovery) = if journal_path.exists() {
            JournalRecovery::recover(&journal_path)?
        } else {
            (Vec::new(), Default::default())
        };
        let pending = JournalRecovery::pending_transfers(&entries);
        let next_transfer_id = entries
            .iter()
            .map(|e| e.record.transfer_id)
            .max()
            .unwrap_or(0)
            + 1;

        let mut journal = JournalWriter::open(&journal_path, config.journal_sync_strategy)?;
        if pending.is_empty() {
            journal.reset()?;
        } else {
            for transfer in &pending {
                tracing::warn!(
                    transfer_id = transfer.transfer_id,
                    kind = %transfer.kind,
                    filename = %transfer.filename,
                    reached = %transfer.reached,
                    "transfer did not commit; run verify"
                );
            }
        }

        tracing::info!(
            live_dir = %config.live_dir.display(),
            journal_entries = recovery.entries_recovered,
            pending = pending.len(),
            "engine opened"
        );

        Ok(Self {
            config,
            live,
            backup,
            archive,
            journal,
            pending,
            next_transfer_id,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn location(&self, kind: LocationKind) -> &StorageLocation {
        match kind {
            LocationKind::Live => &self.live,
            LocationKind::Backup => &self.backup,
            LocationKind::Archive => &self.archive,
        }
    }

    /// Transfers the journal held unfinished at open
    pub fn pending_transfers(&self) -> &[PendingTransfer] {
        &self.pending
    }

    /// Save files in one location, newest first
    pub fn list(&self, kind: LocationKind) -> Result<Vec<SaveFile>> {
        self.location(kind).list_saves()
    }

    /// Forget unfinished transfers once the locations have been checked
    pub fn clear_journal(&mut self) -> Result<()> {
        self.journal.reset()?;
        self.pending.clear();
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Run one operation
    pub fn execute(&mut self, operation: Operation) -> Result<Outcome> {
        tracing::debug!(%operation, "executing");
        match operation {
            Operation::Unpack { filename } => self.unpack(&filename),
            Operation::Repack { filename } => self.repack(&filename),
            Operation::Archive { filename } => self.archive(&filename).map(Outcome::Transferred),
            Operation::Backup { filename } => self.backup(&filename).map(Outcome::Transferred),
            Operation::Restore { filename, from } => {
                self.restore(&filename, from).map(Outcome::Transferred)
            }
        }
    }

    /// Extract a live save into `Working/<stem>`
    pub fn unpack(&mut self, filename: &str) -> Result<Outcome> {
        let stem = save_stem(filename)?;
        let unpacked = container::unpack(&self.live.path_for(stem), &self.config.working_dir())?;
        Ok(Outcome::Unpacked {
            members: unpacked
                .codecs
                .members()
                .map(|(name, _)| name.to_string())
                .collect(),
            working_dir: unpacked.working_dir,
        })
    }

    /// Pack `Working/<stem>` back into the live save
    ///
    /// Codecs are read again from the live save, so this works in a later
    /// process than the unpack. The working directory is left in place.
    pub fn repack(&mut self, filename: &str) -> Result<Outcome> {
        let stem = save_stem(filename)?;
        let path = self.live.path_for(stem);
        let working_dir = self.config.working_dir().join(stem);
        if !working_dir.is_dir() {
            return Err(BaronError::NotFound(working_dir));
        }
        let codecs = CodecTable::capture(&path)?;
        container::repack(&working_dir, &path, &codecs)?;
        Ok(Outcome::Repacked { path })
    }

    /// Remove `Working/<stem>` if present; returns whether it existed
    pub fn discard_working_dir(&self, filename: &str) -> Result<bool> {
        let stem = save_stem(filename)?;
        let dir = self.config.working_dir().join(stem);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).at("remove working directory", &dir)?;
        Ok(true)
    }

    /// Copy a live save into the backup store
    pub fn backup(&mut self, filename: &str) -> Result<TransferReport> {
        let result = self.transfer_backup(filename);
        self.track(filename, result)
    }

    /// Move a live save into the archive store
    ///
    /// The live save is recompressed with the archive codec, its entry moves
    /// from the live manifest to the archive manifest, and the live file is
    /// deleted last.
    pub fn archive(&mut self, filename: &str) -> Result<TransferReport> {
        let result = self.transfer_archive(filename);
        self.track(filename, result)
    }

    /// Bring a save back into the live directory
    ///
    /// A live save with the same stem is overwritten. Restoring from a
    /// backup leaves the backup alone; restoring from an archive removes
    /// the archive entry and deletes the `.bba` last.
    pub fn restore(&mut self, filename: &str, from: RestoreSource) -> Result<TransferReport> {
        let result = match from {
            RestoreSource::Backup => self.restore_backup(filename),
            RestoreSource::Archive => self.restore_archive(filename),
        };
        self.track(filename, result)
    }

    /// Keep a transfer that stopped part way in the pending list
    fn track(&mut self, filename: &str, result: Result<TransferReport>) -> Result<TransferReport> {
        if let Err(BaronError::PartialTransfer {
            transfer_id,
            kind,
            reached,
            ..
        }) = &result
        {
            self.pending.push(PendingTransfer {
                transfer_id: *transfer_id,
                kind: *kind,
                filename: filename.to_string(),
                reached: *reached,
                last_lsn: self.journal.current_lsn().saturating_sub(1),
            });
        }
        result
    }

    fn transfer_backup(&mut self, filename: &str) -> Result<TransferReport> {
        let kind = TransferKind::Backup;
        let plan = preflight(&self.live, &self.backup, filename)?;
        let mut transfer = Transfer::begin(&mut self.journal, self.next_transfer_id, kind, filename)?;
        self.next_transfer_id += 1;

        transfer.step(TransferState::FileMoved, || {
            copy_into_place(&plan.source_path, &plan.destination_path)
        })?;
        // Backups leave the live entry where it is
        transfer.step(TransferState::SourceManifestUpdated, || Ok(()))?;
        let entries = with_extension(&plan.entries, self.backup.extension());
        transfer.step(TransferState::DestManifestUpdated, || {
            manifest::merge_entries(self.backup.manifest_path(), &entries)
        })?;
        transfer.step(TransferState::Committed, || Ok(()))?;

        Ok(report(&transfer, plan, entries))
    }

    fn transfer_archive(&mut self, filename: &str) -> Result<TransferReport> {
        let kind = TransferKind::Archive;
        let plan = preflight(&self.live, &self.archive, filename)?;
        let mut transfer = Transfer::begin(&mut self.journal, self.next_transfer_id, kind, filename)?;
        self.next_transfer_id += 1;

        let working_root = self.config.working_dir();
        let (codec, level) = (self.config.archive_codec, self.config.archive_level);
        let archive_dir = self.archive.dir().to_path_buf();
        transfer.step(TransferState::FileMoved, || {
            let mut save = SaveContainer::open(&plan.source_path)?;
            let unpacked = save.unpack(&working_root).map(|_| ());
            let packed = unpacked.and_then(|()| save.archive_to(&archive_dir, codec, level));
            let closed = save.close(true);
            let written = packed?;
            closed?;
            Ok(written)
        })?;

        transfer.step(TransferState::SourceManifestUpdated, || {
            manifest::remove_entry(self.live.manifest_path(), &plan.source_name).map(|_| ())
        })?;
        let entries = with_extension(&plan.entries, self.archive.extension());
        transfer.step(TransferState::DestManifestUpdated, || {
            manifest::merge_entries(self.archive.manifest_path(), &entries)
        })?;
        transfer.step(TransferState::Committed, || {
            fs::remove_file(&plan.source_path).at("delete live save", &plan.source_path)
        })?;

        Ok(report(&transfer, plan, entries))
    }

    fn restore_backup(&mut self, filename: &str) -> Result<TransferReport> {
        let kind = TransferKind::RestoreBackup;
        let plan = preflight(&self.backup, &self.live, filename)?;
        let mut transfer = Transfer::begin(&mut self.journal, self.next_transfer_id, kind, filename)?;
        self.next_transfer_id += 1;

        transfer.step(TransferState::FileMoved, || {
            copy_into_place(&plan.source_path, &plan.destination_path)
        })?;
        transfer.step(TransferState::SourceManifestUpdated, || Ok(()))?;
        let entries = with_extension(&plan.entries, self.live.extension());
        transfer.step(TransferState::DestManifestUpdated, || {
            manifest::merge_entries(self.live.manifest_path(), &entries)
        })?;
        transfer.step(TransferState::Committed, || Ok(()))?;

        Ok(report(&transfer, plan, entries))
    }

    fn restore_archive(&mut self, filename: &str) -> Result<TransferReport> {
        let kind = TransferKind::RestoreArchive;
        let plan = preflight(&self.archive, &self.live, filename)?;
        let mut transfer = Transfer::begin(&mut self.journal, self.next_transfer_id, kind, filename)?;
        self.next_transfer_id += 1;

        let working_root = self.config.working_dir();
        let restore_codec = self.config.restore_codec;
        transfer.step(TransferState::FileMoved, || {
            rebuild_live_save(
                &plan.source_path,
                &working_root,
                &plan.destination_path,
                restore_codec,
            )
        })?;

        transfer.step(TransferState::SourceManifestUpdated, || {
            manifest::remove_entry(self.archive.manifest_path(), &plan.source_name).map(|_| ())
        })?;
        let entries = with_extension(&plan.entries, self.live.extension());
        transfer.step(TransferState::DestManifestUpdated, || {
            manifest::merge_entries(self.live.manifest_path(), &entries)
        })?;
        transfer.step(TransferState::Committed, || {
            fs::remove_file(&plan.source_path).at("delete archive", &plan.source_path)
        })?;

        Ok(report(&transfer, plan, entries))
    }

    // =========================================================================
    // Verify
    // =========================================================================

    /// Bijection check for every location, plus unfinished transfers
    pub fn verify_all(&self) -> Result<ConsistencyReport> {
        let mut locations = Vec::with_capacity(LocationKind::ALL.len());
        for kind in LocationKind::ALL {
            locations.push((kind, self.location(kind).verify()?));
        }
        Ok(ConsistencyReport {
            locations,
            pending: self.pending.clone(),
        })
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

/// "hero", "hero.zks" and "hero.bba" all name the save "hero"
///
/// Only a save extension is stripped, so "Manual_4.2_Arodus" keeps its dots.
fn save_stem(filename: &str) -> Result<&str> {
    if filename.contains('/') || filename.contains('\\') {
        return Err(BaronError::Validation(format!(
            "{:?} must be a file name, not a path",
            filename
        )));
    }
    let stem = match filename.rsplit_once('.') {
        Some((stem, extension))
            if LocationKind::ALL
                .iter()
                .any(|kind| kind.extension().eq_ignore_ascii_case(extension)) =>
        {
            stem
        }
        _ => filename,
    };
    if stem.is_empty() || stem == "." || stem == ".." {
        return Err(BaronError::Validation(format!("{:?} is not a save name", filename)));
    }
    Ok(stem)
}

/// Check everything a transfer needs before its first write
fn preflight(
    source: &StorageLocation,
    destination: &StorageLocation,
    filename: &str,
) -> Result<Preflight> {
    let stem = save_stem(filename)?;
    let source_path = source.path_for(stem);
    if !source_path.is_file() {
        return Err(BaronError::NotFound(source_path));
    }

    let source_name = source.file_name(stem);
    let entries = manifest::extract_entry(source.manifest_path(), &source_name)?;
    if entries.is_empty() {
        return Err(BaronError::EntryNotFound {
            manifest: source.manifest_path().to_path_buf(),
            filename: source_name,
        });
    }
    // Destination manifest must load before anything moves
    manifest::load_manifest(destination.manifest_path())?;

    Ok(Preflight {
        source_name,
        source_path,
        destination_path: destination.path_for(stem),
        entries,
    })
}

fn with_extension(entries: &[ManifestEntry], extension: &str) -> Vec<ManifestEntry> {
    entries.iter().map(|e| e.with_extension(extension)).collect()
}

/// Copy through a temporary file so a failed copy never leaves half a save
fn copy_into_place(source: &Path, dest: &Path) -> Result<()> {
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BaronError::Validation(format!("no file name in {}", dest.display())))?;
    let temp = dest.with_file_name(format!(".{}.tmp", name));
    if let Err(e) = fs::copy(source, &temp) {
        let _ = fs::remove_file(&temp);
        return Err(BaronError::IoAt {
            action: "copy save",
            path: source.to_path_buf(),
            source: e,
        });
    }
    container::replace_file(&temp, dest)?;
    tracing::debug!(from = %source.display(), to = %dest.display(), "save copied");
    Ok(())
}

/// Unpack an archive and repack every member with `codec` into `dest`
fn rebuild_live_save(
    archive_path: &Path,
    working_root: &Path,
    dest: &Path,
    codec: container::Codec,
) -> Result<()> {
    let unpacked = container::unpack(archive_path, working_root)?;

    let mut codecs = CodecTable::new();
    for (member, _) in unpacked.codecs.members() {
        codecs.insert(member, codec);
    }

    // Build next to the working directory, then move over any live copy
    let stem = container::file_stem(dest)?;
    let staged = working_root.join(format!(".{}.restore", stem));
    let result = fs::remove_file(&staged)
        .or_else(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(e),
        })
        .at("remove stale restore", &staged)
        .and_then(|_| container::repack(&unpacked.working_dir, &staged, &codecs))
        .and_then(|_| container::replace_file(&staged, dest));

    if unpacked.created {
        if let Err(e) = fs::remove_dir_all(&unpacked.working_dir) {
            tracing::warn!(working_dir = %unpacked.working_dir.display(), error = %e, "working directory not removed");
        }
    }
    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}

fn report(transfer: &Transfer<'_>, plan: Preflight, entries: Vec<ManifestEntry>) -> TransferReport {
    TransferReport {
        transfer_id: transfer.id(),
        kind: transfer.kind(),
        source: plan.source_path,
        destination: plan.destination_path,
        entries,
        state: transfer.state(),
    }
}
