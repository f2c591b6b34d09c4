//! Observable progress of an optimization run.
//!
//! Workers append trial timings concurrently; an observer (a status page,
//! a CLI spinner) polls [`ProgressTracker::get_progress`]. Nothing here
//! feeds back into placement decisions.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Point-in-time view of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Whether a run is in progress.
    pub running: bool,
    /// Trials finished, successful or not.
    pub completed_trials: usize,
    /// Trials that failed.
    pub failed_trials: usize,
    /// Trials requested for the run.
    pub total_trials: usize,
    /// Estimated seconds until the run finishes.
    pub eta_seconds: f64,
    /// Best score seen so far, baseline included.
    pub best_score: Option<i64>,
}

#[derive(Debug, Default)]
struct Timings {
    recent: VecDeque<Duration>,
    window: usize,
    workers: usize,
    best_score: Option<i64>,
}

/// Thread-safe accumulator behind [`Progress`].
///
/// Counters are atomics; the timing window and best score sit behind a
/// [`parking_lot::Mutex`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use u_assign::optimizer::ProgressTracker;
///
/// let tracker = ProgressTracker::new();
/// {
///     let _guard = tracker.start(10, 2, 100).unwrap();
///     tracker.record_trial(Duration::from_secs(2));
///     let progress = tracker.get_progress();
///     assert!(progress.running);
///     assert_eq!(progress.completed_trials, 1);
///     assert_eq!(progress.eta_seconds, 9.0);
/// }
/// assert!(!tracker.get_progress().running);
/// ```
#[derive(Debug, Default)]
pub struct ProgressTracker {
    running: AtomicBool,
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: AtomicUsize,
    timings: Mutex<Timings>,
}

/// Marks the tracker as running until dropped.
#[derive(Debug)]
#[must_use = "the run ends when the guard is dropped"]
pub struct RunGuard<'a> {
    tracker: &'a ProgressTracker,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.tracker.running.store(false, Ordering::Release);
    }
}

impl ProgressTracker {
    /// Creates an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run and resets all counters.
    ///
    /// Returns `None` if a run is already in progress.
    pub fn start(&self, total_trials: usize, workers: usize, window: usize) -> Option<RunGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total.store(total_trials, Ordering::Relaxed);
        let mut timings = self.timings.lock();
        timings.recent.clear();
        timings.window = window.max(1);
        timings.workers = workers.max(1);
        timings.best_score = None;
        Some(RunGuard { tracker: self })
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Records a finished trial and its duration.
    pub fn record_trial(&self, elapsed: Duration) {
        let mut timings = self.timings.lock();
        if timings.recent.len() == timings.window {
            timings.recent.pop_front();
        }
        timings.recent.push_back(elapsed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed trial. It counts as completed but adds no timing.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Publishes the current best score.
    pub fn record_best(&self, score: i64) {
        let mut timings = self.timings.lock();
        timings.best_score = Some(timings.best_score.map_or(score, |b| b.max(score)));
    }

    /// Current progress.
    ///
    /// The ETA is the mean of the recent trial durations times the
    /// remaining trials, divided by the worker count. It is zero when no
    /// run is in progress.
    pub fn get_progress(&self) -> Progress {
        let timings = self.timings.lock();
        let completed = self.completed.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let remaining = total.saturating_sub(completed);
        let running = self.is_running();

        // An early stop leaves trials unstarted; nothing is left to wait for.
        let eta_seconds = if !running || timings.recent.is_empty() || remaining == 0 {
            0.0
        } else {
            let sum: f64 = timings.recent.iter().map(Duration::as_secs_f64).sum();
            let mean = sum / timings.recent.len() as f64;
            mean * remaining as f64 / timings.workers.max(1) as f64
        };

        Progress {
            running,
            completed_trials: completed,
            failed_trials: self.failed.load(Ordering::Relaxed),
            total_trials: total,
            eta_seconds,
            best_score: timings.best_score,
        }
    }
}
