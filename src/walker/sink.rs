//! Finding delivery
//!
//! Root walkers push their findings into a [`FindingSink`]. The session uses
//! an unbounded crossbeam channel so that producers never block on a slow
//! or absent consumer; sequential callers can collect into a `Vec`.
//!
//! All root workers share one channel. The completion marker travels on the
//! same channel, which is what puts it behind every finding.

use crate::error::ScanError;
use crate::policy::Warning;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Output of a root traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Warning(Warning),
    Error(ScanError),
}

impl Finding {
    pub fn as_warning(&self) -> Option<&Warning> {
        match self {
            Finding::Warning(w) => Some(w),
            Finding::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ScanError> {
        match self {
            Finding::Warning(_) => None,
            Finding::Error(e) => Some(e),
        }
    }
}

/// Item received by the session consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Warning(Warning),
    Error(ScanError),
    /// Every root has terminated; nothing follows
    Completed,
}

impl From<Finding> for SessionEvent {
    fn from(finding: Finding) -> Self {
        match finding {
            Finding::Warning(w) => SessionEvent::Warning(w),
            Finding::Error(e) => SessionEvent::Error(e),
        }
    }
}

/// The consumer side is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination for findings produced by a walker
pub trait FindingSink {
    fn deliver(&mut self, finding: Finding) -> Result<(), SinkClosed>;
}

impl FindingSink for Vec<Finding> {
    fn deliver(&mut self, finding: Finding) -> Result<(), SinkClosed> {
        self.push(finding);
        Ok(())
    }
}

/// Counters for delivered findings
#[derive(Debug, Default)]
pub struct SinkStats {
    pub warnings: AtomicU64,
    pub errors: AtomicU64,
}

impl SinkStats {
    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Create the session's multi-producer, single-consumer channel
pub fn finding_channel() -> (FindingSender, FindingReceiver) {
    let (sender, receiver) = unbounded();
    let stats = Arc::new(SinkStats::default());

    (
        FindingSender {
            sender,
            stats: Arc::clone(&stats),
        },
        FindingReceiver { receiver, stats },
    )
}

/// Producer handle; clone one per root worker
#[derive(Clone)]
pub struct FindingSender {
    sender: Sender<SessionEvent>,
    stats: Arc<SinkStats>,
}

impl FindingSender {
    /// Send the completion marker
    pub fn complete(&self) -> Result<(), SinkClosed> {
        self.sender.send(SessionEvent::Completed).map_err(|_| SinkClosed)
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }
}

impl FindingSink for FindingSender {
    fn deliver(&mut self, finding: Finding) -> Result<(), SinkClosed> {
        let counter = match &finding {
            Finding::Warning(_) => &self.stats.warnings,
            Finding::Error(_) => &self.stats.errors,
        };
        self.sender.send(finding.into()).map_err(|_| SinkClosed)?;
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Consumer handle
pub struct FindingReceiver {
    receiver: Receiver<SessionEvent>,
    stats: Arc<SinkStats>,
}

impl FindingReceiver {
    /// Block until the next event; `None` once every producer is gone
    pub fn recv(&self) -> Option<SessionEvent> {
        self.receiver.recv().ok()
    }

    /// Wait at most `timeout`
    ///
    /// Returns `Ok(None)` when the wait timed out and `Err(SinkClosed)` when
    /// every producer is gone and the channel is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<SessionEvent>, SinkClosed> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SinkClosed),
        }
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    /// Number of events waiting to be received
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
