//! Journal Recovery
//!
//! Reads the journal after a crash and finds transfers that never finished.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{Result, ResultExt};
use crate::transfer::{TransferKind, TransferState};

use super::reader::{Frame, JournalReader};
use super::JournalEntry;

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether bytes after the last valid entry were (or would be) cut off
    pub was_truncated: bool,
}

/// A transfer whose last journaled state is not terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub transfer_id: u64,
    pub kind: TransferKind,
    pub filename: String,
    /// Last state the transfer reached before it stopped
    pub reached: TransferState,
    pub last_lsn: u64,
}

impl JournalRecovery {
    /// Recover entries from a journal file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new()
                .write(true)
                .open(path)
                .at("open journal", path)?;
            file.set_len(valid_len).at("truncate journal", path)?;
            file.sync_all().at("sync journal", path)?;
            tracing::warn!(
                journal = %path.display(),
                valid_bytes = valid_len,
                corrupted = result.entries_corrupted,
                "journal tail truncated"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a journal file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    /// Transfers whose last recorded state is neither committed nor aborted
    pub fn pending_transfers(entries: &[JournalEntry]) -> Vec<PendingTransfer> {
        let mut latest: BTreeMap<u64, &JournalEntry> = BTreeMap::new();
        for entry in entries {
            latest.insert(entry.record.transfer_id, entry);
        }
        latest
            .into_values()
            .filter(|e| !e.record.state.is_terminal())
            .map(|e| PendingTransfer {
                transfer_id: e.record.transfer_id,
                kind: e.record.kind,
                filename: e.record.filename.clone(),
                reached: e.record.state,
                last_lsn: e.lsn,
            })
            .collect()
    }

    fn scan(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult, u64)> {
        let mut reader = JournalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.read_frame()? {
                Frame::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Frame::End => break,
                Frame::Torn => {
                    result.was_truncated = true;
                    break;
                }
                Frame::Corrupt(reason) => {
                    tracing::warn!(journal = %path.display(), %reason, "corrupt journal entry");
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
            }
        }

        Ok((entries, result, reader.position()))
    }
}
