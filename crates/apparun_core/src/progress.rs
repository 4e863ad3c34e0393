//! Progress reporting and cancellation for long runs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress tracking shared between a run and its caller.
///
/// Cloning shares the same counters, so a caller can keep one handle to
/// poll and cancel while the run holds another.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    /// Completed evaluations counter
    completed: Arc<AtomicUsize>,
    /// Total evaluations planned
    total: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl RunProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing atomics
    pub fn from_atomics(
        completed: Arc<AtomicUsize>,
        total: Arc<AtomicUsize>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            completed,
            total,
            cancelled,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the counters for a run of `total` evaluations
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Request cancellation; the run stops before its next evaluation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Completion fraction in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.completed() as f64 / total as f64
        }
    }
}

/// Stop conditions checked before each evaluation of a run
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunControl<'a> {
    pub progress: Option<&'a RunProgress>,
    pub deadline: Option<Instant>,
}

impl<'a> RunControl<'a> {
    pub fn new(progress: Option<&'a RunProgress>, timeout: Option<Duration>) -> Self {
        Self {
            progress,
            // A deadline past the clock's range is no deadline
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.progress.is_some_and(RunProgress::is_cancelled)
    }

    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn tick(&self) {
        if let Some(progress) = self.progress {
            progress.increment();
        }
    }
}
