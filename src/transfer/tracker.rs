//! Journaled transfer progress
//!
//! A `Transfer` records every state it reaches before the caller moves on,
//! so a crash leaves the last completed step in the journal.

use crate::error::{BaronError, Result};
use crate::journal::{JournalWriter, TransferRecord};

use super::{TransferKind, TransferState};

/// One running transfer bound to the journal
pub struct Transfer<'j> {
    journal: &'j mut JournalWriter,
    id: u64,
    kind: TransferKind,
    filename: String,
    state: TransferState,
}

impl<'j> Transfer<'j> {
    /// Record `Started` and hand back the running transfer
    pub fn begin(
        journal: &'j mut JournalWriter,
        id: u64,
        kind: TransferKind,
        filename: impl Into<String>,
    ) -> Result<Self> {
        let mut transfer = Self {
            journal,
            id,
            kind,
            filename: filename.into(),
            state: TransferState::Started,
        };
        let record = transfer.record(TransferState::Started);
        transfer.journal.append(record)?;
        tracing::info!(
            transfer_id = id,
            kind = %kind,
            filename = %transfer.filename,
            "transfer started"
        );
        Ok(transfer)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Journal `to` as reached
    pub fn advance(&mut self, to: TransferState) -> Result<()> {
        if !self.state.can_advance_to(to) {
            return Err(BaronError::Validation(format!(
                "transfer #{} cannot go from {} to {}",
                self.id, self.state, to
            )));
        }
        let record = self.record(to);
        self.journal.append(record)?;
        self.state = to;
        tracing::info!(transfer_id = self.id, kind = %self.kind, state = %to, "transfer step");
        Ok(())
    }

    /// Run one step and journal `to` when it succeeds
    ///
    /// A failure before any file was written aborts the transfer and returns
    /// the step's own error. A later failure returns `PartialTransfer` naming
    /// the last state that completed. Once `work` has succeeded its effect is
    /// on disk, so a journal failure reports `to` as reached.
    pub fn step<T>(&mut self, to: TransferState, work: impl FnOnce() -> Result<T>) -> Result<T> {
        match work() {
            Ok(value) => match self.advance(to) {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.state = to;
                    Err(self.partial(e))
                }
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: BaronError) -> BaronError {
        if self.state == TransferState::Started {
            if let Err(journal_error) = self.advance(TransferState::Aborted) {
                tracing::warn!(transfer_id = self.id, error = %journal_error, "abort not journaled");
            }
            tracing::warn!(transfer_id = self.id, kind = %self.kind, error = %error, "transfer aborted");
            return error;
        }
        self.partial(error)
    }

    fn partial(&self, error: BaronError) -> BaronError {
        if self.state == TransferState::Started {
            return error;
        }
        tracing::warn!(
            transfer_id = self.id,
            kind = %self.kind,
            reached = %self.state,
            error = %error,
            "partial transfer; storage locations need verify"
        );
        BaronError::PartialTransfer {
            transfer_id: self.id,
            kind: self.kind,
            reached: self.state,
            reason: error.to_string(),
        }
    }

    fn record(&self, state: TransferState) -> TransferRecord {
        TransferRecord {
            transfer_id: self.id,
            kind: self.kind,
            filename: self.filename.clone(),
            state,
        }
    }
}
