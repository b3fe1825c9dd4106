//! Shared completion counter.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Completed/total pair observed after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Jobs completed so far.
    pub completed: usize,
    /// Jobs in the run.
    pub total: usize,
}

impl ProgressSnapshot {
    /// Whole-number percentage complete; an empty run is 100%.
    #[must_use]
    pub const fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.completed.saturating_mul(100) / self.total
        }
    }
}

/// Count of finished folder jobs, incremented once per job from any worker.
#[derive(Debug)]
pub struct ProgressCounter {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressCounter {
    /// Counter for a run of `total` jobs.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Record one finished job and return the resulting snapshot.
    pub fn increment(&self) -> ProgressSnapshot {
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        ProgressSnapshot {
            completed,
            total: self.total,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total,
        }
    }

    /// Jobs in the run.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }
}
