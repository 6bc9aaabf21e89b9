//! Command/response correlation
//!
//! At most one menu command is in flight at a time. The correlator tracks:
//! - Sub-responses still expected (one per `;`-separated sub-command)
//! - Response text accumulated so far
//! - Whether every sub-response so far was acknowledged
//!
//! The waiting caller holds the receiving half of a single-slot channel; the
//! receiver task completes it once the last sub-response arrives.

use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Final result of a completed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Every sub-response ended with ACK
    pub success: bool,

    /// Concatenated sub-responses, status bytes included
    pub response: String,
}

/// Why a pending command was released without a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The receiver stopped
    Shutdown,

    /// The byte stream lost sync and was reset
    StreamReset,
}

/// Value delivered to the waiting caller
pub type Completion = std::result::Result<CommandOutcome, AbortReason>;

/// What happened to a sub-response handed to [`Correlator::on_reply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Appended; more sub-responses expected
    Accumulated { remaining: usize },

    /// Last sub-response; the caller has been released
    Completed,

    /// No command pending (late reply after a timeout)
    Discarded,
}

/// Tracks the single in-flight command
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone, Default)]
pub struct Correlator {
    inner: Arc<Mutex<PendingCommand>>,
}

#[derive(Debug, Default)]
struct PendingCommand {
    /// Sub-responses still expected (0 when idle)
    remaining: usize,

    /// Accumulated response bytes
    response: BytesMut,

    /// Cleared by the first NAK/ENQ
    success: bool,

    /// Single-slot completion signal
    waiter: Option<oneshot::Sender<Completion>>,
}

impl PendingCommand {
    fn clear(&mut self) {
        self.remaining = 0;
        self.response.clear();
        self.success = true;
        self.waiter = None;
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `expected` sub-responses
    ///
    /// # Errors
    ///
    /// Returns [`Error::PendingCommand`] if another command is still waiting.
    pub fn begin(&self, expected: usize) -> Result<oneshot::Receiver<Completion>> {
        let mut pending = self.inner.lock();

        if pending.remaining > 0 {
            return Err(Error::PendingCommand {
                remaining: pending.remaining,
            });
        }

        let (tx, rx) = oneshot::channel();
        pending.clear();
        pending.remaining = expected.max(1);
        pending.waiter = Some(tx);

        debug!("Waiting for {} sub-responses", pending.remaining);
        Ok(rx)
    }

    /// Record one terminated sub-response from the device
    pub fn on_reply(&self, text: &[u8], success: bool) -> ReplyDisposition {
        let mut pending = self.inner.lock();

        if pending.remaining == 0 {
            trace!("Discarding reply with no command pending");
            pending.response.clear();
            return ReplyDisposition::Discarded;
        }

        pending.response.extend_from_slice(text);
        pending.success &= success;
        pending.remaining -= 1;

        if pending.remaining > 0 {
            return ReplyDisposition::Accumulated {
                remaining: pending.remaining,
            };
        }

        let outcome = CommandOutcome {
            success: pending.success,
            response: String::from_utf8_lossy(&pending.response).into_owned(),
        };
        let waiter = pending.waiter.take();
        pending.clear();
        drop(pending);

        debug!("Command complete (success={})", outcome.success);

        if let Some(waiter) = waiter {
            // The caller may have given up in the meantime
            let _ = waiter.send(Ok(outcome));
        }

        ReplyDisposition::Completed
    }

    /// Forget the pending command so late replies are discarded
    ///
    /// Called by the waiting side on every return path.
    pub fn cancel(&self) {
        self.inner.lock().clear();
    }

    /// Release a waiting caller without a reply
    ///
    /// Returns `true` if a command was pending.
    pub fn abort(&self, reason: AbortReason) -> bool {
        let mut pending = self.inner.lock();

        if pending.remaining == 0 {
            return false;
        }

        let waiter = pending.waiter.take();
        pending.clear();
        drop(pending);

        debug!("Aborting pending command: {:?}", reason);

        if let Some(waiter) = waiter {
            let _ = waiter.send(Err(reason));
        }

        true
    }

    /// Check if a command is waiting for sub-responses
    pub fn is_pending(&self) -> bool {
        self.inner.lock().remaining > 0
    }

    /// Sub-responses still expected
    pub fn remaining(&self) -> usize {
        self.inner.lock().remaining
    }
}
