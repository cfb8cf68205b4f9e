//! Transfer Journal Module
//!
//! Append-only record of every step a transfer reaches, so a crash between
//! steps can be reported on the next start.
//!
//! ## Responsibilities
//! - Append one record per transfer state change
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Recovery: truncate torn tails and list unfinished transfers
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! `Data` is a bincode-encoded [`TransferRecord`] plus a timestamp.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{JournalEntry, TransferRecord, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use reader::{JournalIterator, JournalReader};
pub use recovery::{JournalRecovery, PendingTransfer, RecoveryResult};
pub use writer::JournalWriter;
