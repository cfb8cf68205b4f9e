//! Journal Reader
//!
//! Handles reading entries from the journal file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{BaronError, Result, ResultExt};

use super::entry::FrameHeader;
use super::{JournalEntry, HEADER_SIZE};

/// What the next frame in the file turned out to be
#[derive(Debug)]
pub(crate) enum Frame {
    Entry(JournalEntry),
    /// Clean end of file
    End,
    /// File ends inside a header or payload
    Torn,
    /// Complete frame that fails validation
    Corrupt(String),
}

/// Reads entries from the journal file
pub struct JournalReader {
    reader: BufReader<File>,
    /// Offset of the first byte not yet consumed by a valid entry
    position: u64,
}

impl JournalReader {
    /// Open a journal file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).at("open journal", path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Byte offset just past the last valid entry read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next entry; torn or corrupt frames are errors
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>> {
        match self.read_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn => Err(BaronError::JournalCorruption(format!(
                "torn record at offset {}",
                self.position
            ))),
            Frame::Corrupt(reason) => Err(BaronError::JournalCorruption(reason)),
        }
    }

    /// Iterate over entries until the end or the first bad frame
    pub fn entries(self) -> JournalIterator {
        JournalIterator {
            reader: self,
            done: false,
        }
    }

    pub(crate) fn read_frame(&mut self) -> Result<Frame> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header_bytes)? {
            0 => return Ok(Frame::End),
            n if n < HEADER_SIZE => return Ok(Frame::Torn),
            _ => {}
        }

        let header = match FrameHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(e) => return Ok(Frame::Corrupt(e.to_string())),
        };

        let mut payload = vec![0u8; header.len as usize];
        if read_full(&mut self.reader, &mut payload)? < payload.len() {
            return Ok(Frame::Torn);
        }

        match JournalEntry::from_payload(&header, &payload) {
            Ok(entry) => {
                self.position += (HEADER_SIZE + payload.len()) as u64;
                Ok(Frame::Entry(entry))
            }
            Err(e) => Ok(Frame::Corrupt(e.to_string())),
        }
    }
}

/// Iterator over journal entries
pub struct JournalIterator {
    reader: JournalReader,
    done: bool,
}

impl Iterator for JournalIterator {
    type Item = Result<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
