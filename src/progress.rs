//! Progress reporting for batch downloads
//!
//! A [`ProgressSink`] is handed explicitly to every fetch task as an
//! `Arc<dyn ProgressSink>`; there is no global progress state. Units are KiB
//! of declared artifact size. Implementations must tolerate concurrent
//! `update` calls from many tasks without losing increments.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress for a batch of work
pub trait ProgressSink: Send + Sync {
    /// A task of `total` units is starting
    fn begin_task(&self, label: &str, total: u64);

    /// `delta` more units are done
    fn update(&self, delta: u64);

    /// The current task is finished
    fn end_task(&self);
}

/// Discards all progress
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin_task(&self, _label: &str, _total: u64) {}
    fn update(&self, _delta: u64) {}
    fn end_task(&self) {}
}

/// Lock-free progress counters that callers can poll
///
/// Useful for embedding applications that render their own progress bars.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicU64,
    done: AtomicU64,
    begun: AtomicU64,
    ended: AtomicU64,
    label: Mutex<Option<String>>,
}

impl ProgressCounter {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Units declared by the last `begin_task`
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Units completed since the last `begin_task`
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Acquire)
    }

    /// Number of `begin_task` calls
    pub fn tasks_begun(&self) -> u64 {
        self.begun.load(Ordering::Acquire)
    }

    /// Number of `end_task` calls
    pub fn tasks_ended(&self) -> u64 {
        self.ended.load(Ordering::Acquire)
    }

    /// Label of the current or last task
    pub fn label(&self) -> Option<String> {
        self.label.lock().ok().and_then(|l| l.clone())
    }
}

impl ProgressSink for ProgressCounter {
    fn begin_task(&self, label: &str, total: u64) {
        if let Ok(mut current) = self.label.lock() {
            *current = Some(label.to_string());
        }
        self.total.store(total, Ordering::Release);
        self.done.store(0, Ordering::Release);
        self.begun.fetch_add(1, Ordering::AcqRel);
    }

    fn update(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::AcqRel);
    }

    fn end_task(&self) {
        self.ended.fetch_add(1, Ordering::AcqRel);
    }
}

/// Reports progress as `tracing` events
#[derive(Debug, Default)]
pub struct TracingProgress {
    counter: ProgressCounter,
}

impl TracingProgress {
    /// Create a tracing progress reporter
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TracingProgress {
    fn begin_task(&self, label: &str, total: u64) {
        self.counter.begin_task(label, total);
        tracing::info!(task = label, total_kib = total, "Starting");
    }

    fn update(&self, delta: u64) {
        self.counter.update(delta);
        let done = self.counter.done();
        let total = self.counter.total();
        if total > 0 {
            let percent = (done as f64 * 100.0 / total as f64).min(100.0);
            tracing::debug!(done_kib = done, total_kib = total, "{:.0}%", percent);
        } else {
            tracing::debug!(done_kib = done, "Progress");
        }
    }

    fn end_task(&self) {
        self.counter.end_task();
        tracing::info!(
            task = self.counter.label().unwrap_or_default(),
            done_kib = self.counter.done(),
            "Finished"
        );
    }
}
