//! Tests for journal recovery
//!
//! These tests verify:
//! - Clean recovery
//! - Truncation of torn and corrupt tails
//! - Detection of transfers that never committed

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use baron_builder::journal::{JournalEntry, JournalRecovery};
use baron_builder::transfer::{TransferKind, TransferState};
use tempfile::TempDir;

use super::record;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_journal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transfer.journal");
    (temp_dir, path)
}

fn write_entries(path: &Path, entries: &[JournalEntry]) -> u64 {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.serialize().unwrap()).unwrap();
    }
    file.sync_all().unwrap();
    fs::metadata(path).unwrap().len()
}

fn committed_backup(first_lsn: u64, id: u64) -> Vec<JournalEntry> {
    [
        TransferState::Started,
        TransferState::FileMoved,
        TransferState::SourceManifestUpdated,
        TransferState::DestManifestUpdated,
        TransferState::Committed,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, state)| {
        JournalEntry::new(first_lsn + i as u64, record(id, TransferKind::Backup, state))
    })
    .collect()
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_clean_journal() {
    let (_temp, path) = setup_temp_journal();
    write_entries(&path, &committed_backup(1, 1));

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_truncates_torn_tail() {
    let (_temp, path) = setup_temp_journal();
    let valid_len = write_entries(&path, &committed_backup(1, 1));
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[9u8; 7]).unwrap();
    drop(file);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(entries.len(), 5);
    assert!(result.was_truncated);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), valid_len);
}

#[test]
fn test_recover_stops_at_corrupt_entry() {
    let (_temp, path) = setup_temp_journal();
    let entries = committed_backup(1, 1);
    let first_len = entries[0].encoded_len().unwrap();
    write_entries(&path, &entries);

    // Damage the second entry's payload
    let mut bytes = fs::read(&path).unwrap();
    bytes[first_len + 20] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let (recovered, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(recovered.len(), 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), first_len as u64);
}

#[test]
fn test_verify_does_not_modify() {
    let (_temp, path) = setup_temp_journal();
    write_entries(&path, &committed_backup(1, 1));
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0u8; 3]).unwrap();
    drop(file);
    let before = fs::metadata(&path).unwrap().len();

    let result = JournalRecovery::verify(&path).unwrap();

    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), before);
}

// =============================================================================
// Pending Transfer Tests
// =============================================================================

#[test]
fn test_committed_transfers_are_not_pending() {
    let entries = committed_backup(1, 1);
    assert!(JournalRecovery::pending_transfers(&entries).is_empty());
}

#[test]
fn test_unfinished_transfer_reported_with_last_state() {
    let mut entries = committed_backup(1, 1);
    entries.push(JournalEntry::new(6, record(2, TransferKind::Archive, TransferState::Started)));
    entries.push(JournalEntry::new(7, record(2, TransferKind::Archive, TransferState::FileMoved)));

    let pending = JournalRecovery::pending_transfers(&entries);

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].transfer_id, 2);
    assert_eq!(pending[0].kind, TransferKind::Archive);
    assert_eq!(pending[0].reached, TransferState::FileMoved);
    assert_eq!(pending[0].filename, "hero.zks");
    assert_eq!(pending[0].last_lsn, 7);
}

#[test]
fn test_aborted_transfer_is_not_pending() {
    let entries = vec![
        JournalEntry::new(1, record(4, TransferKind::RestoreBackup, TransferState::Started)),
        JournalEntry::new(2, record(4, TransferKind::RestoreBackup, TransferState::Aborted)),
    ];
    assert!(JournalRecovery::pending_transfers(&entries).is_empty());
}
