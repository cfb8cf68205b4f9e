//! Tests for journal entry framing
//!
//! These tests verify:
//! - Header layout (LSN, CRC, length)
//! - CRC32 corruption detection
//! - Truncated and oversized frames

use baron_builder::journal::{JournalEntry, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use baron_builder::transfer::{TransferKind, TransferState};
use baron_builder::BaronError;

use super::record;

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_serialize_deserialize_entry() {
    let entry = JournalEntry::new(7, record(3, TransferKind::Archive, TransferState::FileMoved));

    let bytes = entry.serialize().unwrap();
    let recovered = JournalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_header_layout() {
    let entry = JournalEntry::new(0x0102, record(1, TransferKind::Backup, TransferState::Started));
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &0x0102u64.to_le_bytes());
    let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);
    assert_eq!(entry.encoded_len().unwrap(), bytes.len());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_flipped_payload_byte_detected() {
    let entry = JournalEntry::new(1, record(1, TransferKind::Backup, TransferState::Committed));
    let mut bytes = entry.serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let result = JournalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(BaronError::JournalCorruption(_))));
}

#[test]
fn test_flipped_lsn_detected() {
    let entry = JournalEntry::new(1, record(1, TransferKind::Backup, TransferState::Committed));
    let mut bytes = entry.serialize().unwrap();
    bytes[0] = 2;

    assert!(JournalEntry::deserialize(&bytes).is_err());
}

#[test]
fn test_truncated_header() {
    let result = JournalEntry::deserialize(&[0u8; HEADER_SIZE - 1]);
    assert!(matches!(result, Err(BaronError::JournalCorruption(_))));
}

#[test]
fn test_truncated_payload() {
    let entry = JournalEntry::new(1, record(1, TransferKind::RestoreArchive, TransferState::Started));
    let bytes = entry.serialize().unwrap();

    let result = JournalEntry::deserialize(&bytes[..bytes.len() - 2]);
    assert!(matches!(result, Err(BaronError::JournalCorruption(_))));
}

#[test]
fn test_oversized_length_rejected() {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[12..16].copy_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_le_bytes());

    let result = JournalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(BaronError::JournalCorruption(_))));
}
