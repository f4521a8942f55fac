//! Failure tracking for groups of asynchronous calls.
//!
//! A [`Sequence`] starts out successful and switches once, to the first failure reported by any
//! of its tasks. Tasks check it before doing any work, so a failure stops every stage that has
//! not started yet. A [`Request`] records the outcome of one call inside the sequence.

use crate::{Result, TileError};
use std::sync::OnceLock;

/// Status of one asynchronous call.
#[derive(Debug, Default)]
pub struct Request {
    status: OnceLock<TileError>,
}

impl Request {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn status(&self) -> Result<()> {
        match self.status.get() {
            None => Ok(()),
            Some(err) => Err(err.clone()),
        }
    }
}

/// Shared status of a group of asynchronous calls.
///
/// When several tasks fail concurrently, the first failure to be recorded wins and the others
/// are only kept in their requests.
#[derive(Debug, Default)]
pub struct Sequence {
    status: OnceLock<TileError>,
}

impl Sequence {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` in `request` and, if the sequence is still successful, in the sequence.
    pub fn fail(&self, request: &Request, err: TileError) {
        let _ = request.status.set(err.clone());
        if let Err(lost) = self.status.set(err) {
            log::debug!(target: "tilework", "sequence already failed, keeping only: {lost}");
        }
    }

    #[inline]
    pub fn status(&self) -> Result<()> {
        match self.status.get() {
            None => Ok(()),
            Some(err) => Err(err.clone()),
        }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status.get().is_some()
    }

    /// Fails `request` with [`TileError::SequenceFailed`] if the sequence already failed.
    ///
    /// Used by the entry points before they submit a new stage.
    #[inline]
    pub(crate) fn check(&self, request: &Request) -> Result<()> {
        if self.is_failed() {
            let _ = request.status.set(TileError::SequenceFailed);
            return Err(TileError::SequenceFailed);
        }
        Ok(())
    }
}
