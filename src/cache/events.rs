//! Regeneration signals and the coalescing queue feeding the worker.
//!
//! The queue is a bounded channel with one slot per signal kind. A per-kind
//! pending flag folds repeated signals into the one already waiting, so
//! publishing never blocks the mutation path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";
const METRIC_SIGNAL_COALESCED: &str = "quire_regeneration_signal_coalesced_total";
const METRIC_SIGNAL_DROPPED: &str = "quire_regeneration_signal_dropped_total";

/// One slot per distinct signal kind.
pub const SIGNAL_QUEUE_CAPACITY: usize = 2;

/// A composite page whose source data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegenerationSignal {
    Series,
    Archive,
}

impl RegenerationSignal {
    pub const ALL: [RegenerationSignal; 2] = [RegenerationSignal::Series, RegenerationSignal::Archive];

    pub fn as_str(self) -> &'static str {
        match self {
            RegenerationSignal::Series => "series",
            RegenerationSignal::Archive => "archive",
        }
    }

    fn slot(self) -> usize {
        match self {
            RegenerationSignal::Series => 0,
            RegenerationSignal::Archive => 1,
        }
    }
}

/// Outcome of [`SignalQueue::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    Enqueued,
    /// A signal of the same kind was already waiting.
    Coalesced,
    /// The worker has shut down.
    Closed,
}

#[derive(Debug, Default)]
struct PendingSignals {
    flags: [AtomicBool; SIGNAL_QUEUE_CAPACITY],
}

impl PendingSignals {
    /// Returns true when the flag was not already set.
    fn mark(&self, signal: RegenerationSignal) -> bool {
        !self.flags[signal.slot()].swap(true, Ordering::AcqRel)
    }

    fn clear(&self, signal: RegenerationSignal) {
        self.flags[signal.slot()].store(false, Ordering::Release);
    }

    fn is_pending(&self, signal: RegenerationSignal) -> bool {
        self.flags[signal.slot()].load(Ordering::Acquire)
    }
}

/// Producer side. Shared by the bulk loader and the write path.
pub struct SignalQueue {
    sender: Mutex<Option<mpsc::Sender<RegenerationSignal>>>,
    pending: Arc<PendingSignals>,
}

/// Consumer side, owned by the regeneration worker.
pub struct SignalReceiver {
    receiver: mpsc::Receiver<RegenerationSignal>,
    pending: Arc<PendingSignals>,
}

impl SignalQueue {
    pub fn new() -> (Self, SignalReceiver) {
        let (sender, receiver) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);
        let pending = Arc::new(PendingSignals::default());

        let queue = Self {
            sender: Mutex::new(Some(sender)),
            pending: Arc::clone(&pending),
        };
        let receiver = SignalReceiver { receiver, pending };
        (queue, receiver)
    }

    /// Publish a signal without waiting on the worker.
    pub fn publish(&self, signal: RegenerationSignal) -> Published {
        if !self.pending.mark(signal) {
            counter!(METRIC_SIGNAL_COALESCED, "kind" => signal.as_str()).increment(1);
            debug!(signal = signal.as_str(), "Regeneration signal coalesced");
            return Published::Coalesced;
        }

        let guard = mutex_lock(&self.sender, SOURCE, "publish");
        let Some(sender) = guard.as_ref() else {
            self.pending.clear(signal);
            return Published::Closed;
        };

        match sender.try_send(signal) {
            Ok(()) => {
                debug!(signal = signal.as_str(), "Regeneration signal enqueued");
                Published::Enqueued
            }
            Err(TrySendError::Full(_)) => {
                // Unreachable while every kind holds at most one slot.
                self.pending.clear(signal);
                counter!(METRIC_SIGNAL_DROPPED, "kind" => signal.as_str()).increment(1);
                warn!(
                    signal = signal.as_str(),
                    "Regeneration queue full; signal dropped"
                );
                Published::Coalesced
            }
            Err(TrySendError::Closed(_)) => {
                self.pending.clear(signal);
                Published::Closed
            }
        }
    }

    pub fn is_pending(&self, signal: RegenerationSignal) -> bool {
        self.pending.is_pending(signal)
    }

    /// Stop accepting signals. The worker drains what is queued and exits.
    pub fn close(&self) {
        mutex_lock(&self.sender, SOURCE, "close").take();
    }
}

impl SignalReceiver {
    /// Wait for the next signal. The kind's pending flag is cleared before the
    /// signal is handed out, so anything published during the recomputation
    /// schedules another one.
    pub async fn recv(&mut self) -> Option<RegenerationSignal> {
        let signal = self.receiver.recv().await?;
        self.pending.clear(signal);
        Some(signal)
    }
}
