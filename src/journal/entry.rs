//! Journal Entry definitions
//!
//! Defines the structure and framing of individual journal records.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{BaronError, Result};
use crate::transfer::{TransferKind, TransferState};

/// Header size: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload accepted when reading (guards against garbage lengths)
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

/// A single record in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The transfer step being recorded
    pub record: TransferRecord,

    /// Timestamp (unix millis) when the entry was created
    pub timestamp: u64,
}

/// One state reached by one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: u64,
    pub kind: TransferKind,
    /// Filename the transfer was asked to move
    pub filename: String,
    pub state: TransferState,
}

/// Serialized part of an entry (the LSN lives in the header)
#[derive(Serialize, Deserialize)]
struct Payload {
    record: TransferRecord,
    timestamp: u64,
}

impl JournalEntry {
    pub fn new(lsn: u64, record: TransferRecord) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            record,
            timestamp,
        }
    }

    /// Frame the entry: `[lsn][crc][len][payload]`, little endian
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&Payload {
            record: self.record.clone(),
            timestamp: self.timestamp,
        })
        .map_err(|e| BaronError::Serialization(e.to_string()))?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u64_le(self.lsn);
        buf.put_u32_le(compute_crc(self.lsn, &payload));
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);
        Ok(buf.to_vec())
    }

    /// Parse one framed entry from the start of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes)?;
        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(BaronError::JournalCorruption(format!(
                "incomplete payload: expected {} bytes, got {}",
                header.len,
                bytes.len() - HEADER_SIZE
            )));
        }
        Self::from_payload(&header, &bytes[HEADER_SIZE..end])
    }

    /// Build an entry from a parsed header and its payload, checking the CRC
    pub(crate) fn from_payload(header: &FrameHeader, payload: &[u8]) -> Result<Self> {
        let actual = compute_crc(header.lsn, payload);
        if actual != header.crc {
            return Err(BaronError::JournalCorruption(format!(
                "CRC mismatch at LSN {}: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, actual
            )));
        }
        let decoded: Payload = bincode::deserialize(payload)
            .map_err(|e| BaronError::JournalCorruption(format!("LSN {}: {}", header.lsn, e)))?;
        Ok(Self {
            lsn: header.lsn,
            record: decoded.record,
            timestamp: decoded.timestamp,
        })
    }

    /// Total framed size in bytes
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(self.serialize()?.len())
    }
}

/// Decoded fixed-size header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(BaronError::JournalCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        let mut buf = &bytes[..HEADER_SIZE];
        let header = Self {
            lsn: buf.get_u64_le(),
            crc: buf.get_u32_le(),
            len: buf.get_u32_le(),
        };
        if header.len > MAX_PAYLOAD_SIZE {
            return Err(BaronError::JournalCorruption(format!(
                "payload too large at LSN {}: {} bytes (max {})",
                header.lsn, header.len, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(header)
    }
}

/// CRC32 over the LSN and payload
fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
