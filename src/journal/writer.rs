//! Journal Writer
//!
//! Handles appending transfer records to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::JournalSyncStrategy;
use crate::error::{Result, ResultExt};

use super::recovery::JournalRecovery;
use super::{JournalEntry, TransferRecord};

/// Appends records to the journal file
pub struct JournalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next appended record receives
    next_lsn: u64,
    sync_strategy: JournalSyncStrategy,
    /// Records written since the last fsync
    unsynced: usize,
}

impl JournalWriter {
    /// Open or create a journal file
    ///
    /// An existing file is recovered first so a torn tail never sits in
    /// front of new records.
    pub fn open(path: &Path, sync_strategy: JournalSyncStrategy) -> Result<Self> {
        let next_lsn = if path.exists() {
            let (_, result) = JournalRecovery::recover(path)?;
            result.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .at("open journal", path)?;

        tracing::debug!(journal = %path.display(), next_lsn, "journal opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a record; returns the LSN it was written under
    pub fn append(&mut self, record: TransferRecord) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = JournalEntry::new(lsn, record).serialize()?;

        self.writer
            .write_all(&bytes)
            .at("append to journal", &self.path)?;
        self.next_lsn += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            JournalSyncStrategy::EveryWrite => true,
            JournalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        } else {
            self.writer.flush().at("flush journal", &self.path)?;
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush().at("flush journal", &self.path)?;
        self.writer
            .get_ref()
            .sync_data()
            .at("sync journal", &self.path)?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN the next record will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Records written but not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.unsynced
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop every record; LSNs keep increasing
    pub fn reset(&mut self) -> Result<()> {
        self.writer.flush().at("flush journal", &self.path)?;
        self.writer
            .get_ref()
            .set_len(0)
            .at("truncate journal", &self.path)?;
        self.writer
            .get_ref()
            .sync_all()
            .at("sync journal", &self.path)?;
        self.unsynced = 0;
        tracing::debug!(journal = %self.path.display(), "journal reset");
        Ok(())
    }
}

#[cfg(test)]
impl JournalWriter {
    /// Writer over a handle that rejects every write
    pub(crate) fn read_only(path: &Path, sync_strategy: JournalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .at("open journal", path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn: 1,
            sync_strategy,
            unsynced: 0,
        })
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            tracing::warn!(journal = %self.path.display(), error = %e, "journal sync on close failed");
        }
    }
}
