//! Debounced persist scheduler
//!
//! Coalesces bursts of writes into one write per key.
//!
//! ## Timeline
//! ```text
//! schedule(a=1) ─┐
//! schedule(a=2) ─┼─ each call restarts the delay
//! schedule(a=3) ─┘
//!                 └──── delay ────► worker writes a=3 once
//! ```
//!
//! ## Concurrency:
//! - `pending`: Mutex holding the latest value per key and the deadline
//! - `write_lock`: serializes actual writes, so a background flush and a
//!   synchronous `flush()` can never land an older value after a newer one
//! - The worker thread only sleeps, wakes and flushes; the owning engine
//!   thread is never blocked on storage except in `flush`/`close`

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::error::{Result, TableError};

use super::StorageBackend;

/// Default debounce window
pub const DEFAULT_PERSIST_DELAY: Duration = Duration::from_millis(500);

/// One key/value pair to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistEntry {
    pub key: String,
    /// Serialized JSON text
    pub value: String,
}

impl PersistEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Serialize `value` as JSON
    pub fn json<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(key, serde_json::to_string(value)?))
    }
}

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Pending {
    entries: BTreeMap<String, String>,
    deadline: Option<Instant>,
}

struct Shared {
    backend: Arc<dyn StorageBackend>,
    pending: Mutex<Pending>,
    write_lock: Mutex<()>,
}

enum Signal {
    /// Deadline changed; recompute the wait
    Wake,
    Shutdown,
}

impl Shared {
    /// Write whatever is pending, if `due` allows it
    fn flush_where(&self, due: impl FnOnce(&Pending) -> bool) -> FlushReport {
        let _write_guard = self.write_lock.lock();

        let batch = {
            let mut pending = self.pending.lock();
            if !due(&pending) {
                return FlushReport::default();
            }
            pending.deadline = None;
            std::mem::take(&mut pending.entries)
        };

        self.write_batch(batch)
    }

    /// Write a batch; failed entries go back to `pending` without a
    /// deadline, so the next `schedule` or `close` retries them
    fn write_batch(&self, batch: BTreeMap<String, String>) -> FlushReport {
        let mut report = FlushReport::default();
        let mut failed = Vec::new();
        for (key, value) in batch {
            match self.backend.set(&key, &value) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    error!(key = %key, error = %e, "Failed to persist config value");
                    report.failed += 1;
                    failed.push((key, value));
                }
            }
        }

        if !failed.is_empty() {
            let mut pending = self.pending.lock();
            for (key, value) in failed {
                // A value scheduled since this batch was taken is newer
                pending.entries.entry(key).or_insert(value);
            }
        }
        if report.written + report.failed > 0 {
            debug!(written = report.written, failed = report.failed, "Flushed persisted config");
        }
        report
    }
}

/// Debounced writer in front of a [`StorageBackend`]
///
/// A zero delay writes through synchronously and starts no worker thread.
pub struct PersistScheduler {
    shared: Arc<Shared>,
    delay: Duration,
    signals: Option<Sender<Signal>>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

impl PersistScheduler {
    /// Create a scheduler; spawns the worker thread when `delay` is non-zero
    pub fn new(backend: Arc<dyn StorageBackend>, delay: Duration) -> Result<Self> {
        let shared = Arc::new(Shared {
            backend,
            pending: Mutex::new(Pending::default()),
            write_lock: Mutex::new(()),
        });

        if delay.is_zero() {
            return Ok(Self {
                shared,
                delay,
                signals: None,
                worker: None,
                closed: false,
            });
        }

        let (tx, rx) = channel::unbounded();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("tablekit-persist".to_string())
            .spawn(move || run_worker(worker_shared, rx))?;

        Ok(Self {
            shared,
            delay,
            signals: Some(tx),
            worker: Some(worker),
            closed: false,
        })
    }

    /// Queue entries, replacing any pending value for the same key, and
    /// restart the debounce timer
    pub fn schedule<I>(&self, entries: I)
    where
        I: IntoIterator<Item = PersistEntry>,
    {
        {
            let mut pending = self.shared.pending.lock();
            for entry in entries {
                trace!(key = %entry.key, "Scheduling config write");
                pending.entries.insert(entry.key, entry.value);
            }
            if pending.entries.is_empty() {
                return;
            }
            pending.deadline = Some(Instant::now() + self.delay);
        }

        let woke = match &self.signals {
            Some(tx) => tx.send(Signal::Wake).is_ok(),
            None => false,
        };
        if !woke {
            if self.signals.is_some() {
                warn!("Persist worker is gone; writing synchronously");
            }
            self.flush();
        }
    }

    /// Write everything pending now, on the caller's thread
    pub fn flush(&self) -> FlushReport {
        self.shared.flush_where(|_| true)
    }

    /// Number of keys waiting to be written
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().entries.len()
    }

    /// Stop the worker and flush synchronously
    pub fn close(mut self) -> Result<FlushReport> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<FlushReport> {
        if self.closed {
            return Ok(FlushReport::default());
        }
        self.closed = true;

        if let Some(tx) = self.signals.take() {
            // A send error only means the worker already exited
            let _ = tx.send(Signal::Shutdown);
        }
        let joined = match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TableError::Scheduler("persist worker panicked".to_string())),
            None => Ok(()),
        };

        // Flush even if the worker died, so no edit is lost
        let report = self.flush();
        joined.map(|_| report)
    }
}

impl Drop for PersistScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "Persist scheduler shutdown failed");
        }
    }
}

fn run_worker(shared: Arc<Shared>, signals: Receiver<Signal>) {
    trace!("Persist worker started");
    loop {
        let deadline = shared.pending.lock().deadline;
        let signal = match deadline {
            Some(deadline) => signals.recv_deadline(deadline),
            None => signals.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match signal {
            Ok(Signal::Wake) => continue,
            Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                // The deadline may have moved while we waited
                shared.flush_where(|pending| pending.deadline.is_some_and(|d| d <= now));
            }
        }
    }
    trace!("Persist worker stopped");
}
