//! Outcome of a background database delete.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::io;
use std::time::Duration;

/// How a database delete ended.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The backing file was removed.
    Removed,
    /// There was no backing file to remove.
    AlreadyAbsent,
    /// The file could not be removed. Reported, never raised.
    Failed(io::Error),
}

impl DeleteOutcome {
    /// True when the file is gone, whoever removed it.
    pub fn is_success(&self) -> bool {
        !matches!(self, DeleteOutcome::Failed(_))
    }

    pub(crate) fn from_io(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => DeleteOutcome::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DeleteOutcome::AlreadyAbsent,
            Err(e) => DeleteOutcome::Failed(e),
        }
    }
}

/// Handle to a delete running in the background.
///
/// Dropping the handle does not cancel the delete.
#[derive(Debug)]
pub struct DeleteHandle {
    receiver: Receiver<DeleteOutcome>,
}

impl DeleteHandle {
    pub(crate) fn new(receiver: Receiver<DeleteOutcome>) -> Self {
        Self { receiver }
    }

    /// Block until the delete finishes.
    pub fn wait(self) -> DeleteOutcome {
        self.receiver
            .recv()
            .unwrap_or_else(|_| DeleteOutcome::Failed(worker_gone()))
    }

    /// Block for at most `timeout`. Returns `None` if the delete is still
    /// running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<DeleteOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(DeleteOutcome::Failed(worker_gone())),
        }
    }

    /// Poll without blocking.
    pub fn try_outcome(&self) -> Option<DeleteOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(DeleteOutcome::Failed(worker_gone())),
        }
    }
}

fn worker_gone() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "delete worker exited without reporting")
}
