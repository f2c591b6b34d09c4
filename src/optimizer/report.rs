//! Outcome of an optimization run.

use serde::{Deserialize, Serialize};

use crate::store::PersistReport;

/// A trial that was dropped from the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialFailure {
    /// Index of the trial.
    pub trial_index: usize,
    /// Rendered [`TrialError`](crate::error::TrialError).
    pub message: String,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Score of the snapshot with no new placements.
    pub baseline_score: i64,
    /// Score of the assignment stored before the run.
    pub database_score: i64,
    /// Score of the best state found, baseline included.
    pub best_score: i64,
    /// Best score any trial could reach.
    pub max_score: i64,
    /// Trials requested by the configuration.
    pub requested_trials: usize,
    /// Trials that finished successfully.
    pub completed_trials: usize,
    /// Trials that failed.
    pub failed_trials: usize,
    /// Trial that produced the best state; `None` for the baseline.
    pub best_trial: Option<usize>,
    /// What the final write did; `None` if the stored assignment was kept.
    pub persisted: Option<PersistReport>,
    /// Failed trials with their errors.
    pub failures: Vec<TrialFailure>,
}

impl OptimizationReport {
    /// Whether the best score reached [`max_score`](Self::max_score).
    pub fn is_perfect(&self) -> bool {
        self.best_score >= self.max_score
    }

    /// Trials that never started because of an early stop.
    pub fn skipped_trials(&self) -> usize {
        self.requested_trials
            .saturating_sub(self.completed_trials + self.failed_trials)
    }

    /// One-line status for an admin view.
    ///
    /// ```
    /// use u_assign::optimizer::OptimizationReport;
    /// use u_assign::store::PersistReport;
    ///
    /// let report = OptimizationReport {
    ///     baseline_score: -60,
    ///     database_score: -60,
    ///     best_score: 39,
    ///     max_score: 40,
    ///     requested_trials: 10,
    ///     completed_trials: 10,
    ///     failed_trials: 0,
    ///     best_trial: Some(3),
    ///     persisted: Some(PersistReport::default()),
    ///     failures: Vec::new(),
    /// };
    /// assert_eq!(report.summary(), "best score 39 of 40 (trial 3, 10/10 trials completed)");
    /// ```
    pub fn summary(&self) -> String {
        if self.completed_trials == 0 && self.failed_trials > 0 {
            let first = self
                .failures
                .first()
                .map(|f| f.message.as_str())
                .unwrap_or("unknown error");
            return format!(
                "no trial completed ({} failed, first error: {first}); kept stored score {}",
                self.failed_trials, self.database_score
            );
        }
        match (self.best_trial, self.persisted) {
            (Some(trial), Some(_)) => format!(
                "best score {} of {} (trial {trial}, {}/{} trials completed)",
                self.best_score, self.max_score, self.completed_trials, self.requested_trials
            ),
            _ => format!(
                "no trial beat the stored score {} ({}/{} trials completed)",
                self.database_score, self.completed_trials, self.requested_trials
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> OptimizationReport {
        OptimizationReport {
            baseline_score: -90,
            database_score: -90,
            best_score: -90,
            max_score: 60,
            requested_trials: 4,
            completed_trials: 0,
            failed_trials: 0,
            best_trial: None,
            persisted: None,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_summary_all_failed() {
        let mut r = report();
        r.failed_trials = 4;
        r.failures.push(TrialFailure {
            trial_index: 0,
            message: "trial panicked: boom".into(),
        });
        assert_eq!(
            r.summary(),
            "no trial completed (4 failed, first error: trial panicked: boom); kept stored score -90"
        );
    }

    #[test]
    fn test_summary_no_improvement() {
        let mut r = report();
        r.completed_trials = 4;
        assert_eq!(
            r.summary(),
            "no trial beat the stored score -90 (4/4 trials completed)"
        );
        assert!(!r.is_perfect());
    }

    #[test]
    fn test_skipped_trials() {
        let mut r = report();
        r.completed_trials = 1;
        r.best_score = 60;
        r.best_trial = Some(0);
        assert_eq!(r.skipped_trials(), 3);
        assert!(r.is_perfect());
    }
}
