//! Multi-trial orchestration.
//!
//! # Run lifecycle
//!
//! 1. Claim the progress tracker (one run at a time).
//! 2. Refuse finalized terms, then load the [`Snapshot`] once.
//! 3. Seed the best result with the zero-placement baseline.
//! 4. Run trials on a scoped worker pool. Workers pull trial indices from
//!    a shared counter and send results over a channel; the calling
//!    thread compares them as they arrive.
//! 5. Persist the best state exactly once.
//!
//! A failing or panicking trial is logged and dropped; its siblings keep
//! running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::progress::{Progress, ProgressTracker};
use super::report::{OptimizationReport, TrialFailure};
use crate::config::OptimizerConfig;
use crate::error::{OptimizerError, OptimizerResult, TrialError, TrialResult};
use crate::snapshot::{Snapshot, SnapshotLoader};
use crate::store::AssignmentStore;
use crate::trial::{PlacementStrategy, RotationStrategy, TrialOutcome, TrialRunner, TrialState};
use crate::validation::{underfilled_slots, validate_trial};

/// Builds the strategy for a trial index.
pub type StrategyFactory = dyn Fn(usize) -> Box<dyn PlacementStrategy + Send> + Send + Sync;

/// Golden-ratio increment used to spread per-trial seeds.
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of one trial derived from the run seed.
pub fn trial_seed(seed: u64, trial_index: usize) -> u64 {
    seed ^ (trial_index as u64).wrapping_add(1).wrapping_mul(SEED_SPREAD)
}

/// Runs many randomized trials and persists the best one.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use u_assign::config::OptimizerConfig;
/// use u_assign::models::{Application, Term, Topic};
/// use u_assign::optimizer::Optimizer;
/// use u_assign::store::InMemoryStore;
///
/// let store = Arc::new(
///     InMemoryStore::new()
///         .with_term(Term::new(1, "WS 2026"))
///         .with_topic(Topic::new(1).with_slots(1).with_slot_size(1, 5))
///         .with_application(Application::new(1, 1, 1, 1).with_size(3))
///         .with_application(Application::new(2, 2, 1, 1).with_size(2).with_priority(2)),
/// );
/// let config = OptimizerConfig::new().with_trial_count(8).with_seed(1);
/// let optimizer = Optimizer::new(Arc::clone(&store), config).unwrap();
///
/// let report = optimizer.run_optimization(false).unwrap();
/// assert_eq!(report.best_score, 39);
/// assert_eq!(store.link_count(), 2);
/// ```
pub struct Optimizer<S: AssignmentStore + ?Sized> {
    store: Arc<S>,
    config: OptimizerConfig,
    progress: Arc<ProgressTracker>,
    strategies: Arc<StrategyFactory>,
}

impl<S: AssignmentStore + ?Sized> std::fmt::Debug for Optimizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("config", &self.config)
            .field("progress", &self.progress.get_progress())
            .finish_non_exhaustive()
    }
}

impl<S: AssignmentStore + ?Sized> Optimizer<S> {
    /// Creates an optimizer with [`RotationStrategy`] trials.
    ///
    /// # Errors
    /// [`OptimizerError::Config`] if the configuration is invalid.
    pub fn new(store: Arc<S>, config: OptimizerConfig) -> OptimizerResult<Self> {
        config.validate()?;
        let strategies = rotation_strategies(config.seed);
        Ok(Self {
            store,
            config,
            progress: Arc::new(ProgressTracker::new()),
            strategies,
        })
    }

    /// Replaces the per-trial strategy.
    pub fn with_strategy<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize) -> Box<dyn PlacementStrategy + Send> + Send + Sync + 'static,
    {
        self.strategies = Arc::new(factory);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Shareable progress tracker for observers.
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    /// Current progress.
    pub fn get_progress(&self) -> Progress {
        self.progress.get_progress()
    }

    /// Runs the configured trials and persists the best result.
    ///
    /// # Errors
    /// - [`OptimizerError::AlreadyRunning`] if a run is in progress.
    /// - [`OptimizerError::SnapshotUnavailable`] or
    ///   [`OptimizerError::InvalidSnapshot`] before any trial starts.
    /// - [`OptimizerError::TermFinalized`] if the term is closed.
    /// - [`OptimizerError::PersistenceConflict`] if the final write fails.
    ///
    /// Failed trials are not errors; they are listed in the report.
    pub fn run_optimization(
        &self,
        override_assignments: bool,
    ) -> OptimizerResult<OptimizationReport> {
        let config = &self.config;
        let _guard = self
            .progress
            .start(config.trial_count, config.worker_count, config.eta_window)
            .ok_or(OptimizerError::AlreadyRunning)?;
        let started = Instant::now();

        let term = self
            .store
            .active_term()
            .map_err(OptimizerError::SnapshotUnavailable)?;
        if term.finalized {
            return Err(OptimizerError::TermFinalized(term.name));
        }

        let snapshot = SnapshotLoader::new(self.store.as_ref()).load(override_assignments)?;
        let max_score = snapshot.max_score();
        let database_score = snapshot.database_score();
        let mut best = Best::baseline(TrialState::from_snapshot(&snapshot));
        let baseline_score = best.score;
        self.progress.record_best(baseline_score);

        info!(
            term = %snapshot.term().name,
            override_assignments,
            trials = config.trial_count,
            workers = config.worker_count,
            baseline_score,
            database_score,
            max_score,
            "optimization started"
        );

        let mut completed = 0;
        let mut failures = Vec::new();
        let already_perfect = baseline_score.max(database_score) >= max_score;
        if !(config.stop_on_perfect_score && already_perfect) {
            self.run_trials(&snapshot, max_score, |trial_index, result| match result {
                Ok(outcome) => {
                    completed += 1;
                    self.progress.record_trial(outcome.elapsed);
                    debug!(
                        trial = trial_index,
                        score = outcome.score,
                        placements = outcome.placements,
                        elapsed = ?outcome.elapsed,
                        "trial finished"
                    );
                    if best.offer(outcome) {
                        info!(trial = trial_index, score = best.score, "new best assignment");
                        self.progress.record_best(best.score);
                    }
                }
                Err(err) => {
                    self.progress.record_failure();
                    warn!(trial = trial_index, error = %err, "trial failed");
                    failures.push(TrialFailure {
                        trial_index,
                        message: err.to_string(),
                    });
                }
            });
        }

        // Only a trial that beats the stored assignment may replace it.
        let persisted = match best.trial {
            Some(_) if best.score > database_score => {
                for issue in underfilled_slots(&best.state, snapshot.topics()) {
                    warn!("{}", issue.message);
                }
                if override_assignments {
                    let released = self
                        .store
                        .release_unlocked()
                        .map_err(OptimizerError::PersistenceConflict)?;
                    debug!(released, "released unlocked assignments");
                }
                let persisted = best
                    .state
                    .persist(self.store.as_ref())
                    .map_err(OptimizerError::PersistenceConflict)?;
                Some(persisted)
            }
            _ => {
                info!(
                    best_score = best.score,
                    database_score, "stored assignment kept"
                );
                None
            }
        };

        let report = OptimizationReport {
            baseline_score,
            database_score,
            best_score: best.score,
            max_score,
            requested_trials: config.trial_count,
            completed_trials: completed,
            failed_trials: failures.len(),
            best_trial: best.trial,
            persisted,
            failures,
        };
        info!(
            best_score = report.best_score,
            completed = report.completed_trials,
            failed = report.failed_trials,
            slots = persisted.map_or(0, |p| p.slots),
            elapsed = ?started.elapsed(),
            "optimization finished"
        );
        Ok(report)
    }

    /// Runs trials on the worker pool and hands each result to `on_result`
    /// on the calling thread, in completion order.
    fn run_trials<F>(&self, snapshot: &Snapshot, max_score: i64, mut on_result: F)
    where
        F: FnMut(usize, TrialResult<TrialOutcome>),
    {
        let trial_count = self.config.trial_count;
        let workers = self.config.worker_count.min(trial_count);
        let stop_on_perfect = self.config.stop_on_perfect_score;

        let next_trial = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next_trial = &next_trial;
                let stop = &stop;
                let strategies = self.strategies.as_ref();
                scope.spawn(move || loop {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let trial_index = next_trial.fetch_add(1, Ordering::Relaxed);
                    if trial_index >= trial_count {
                        break;
                    }
                    let result = run_isolated(snapshot, strategies, trial_index);
                    if stop_on_perfect && matches!(&result, Ok(o) if o.score >= max_score) {
                        stop.store(true, Ordering::Relaxed);
                    }
                    if tx.send((trial_index, result)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (trial_index, result) in rx {
                on_result(trial_index, result);
            }
        });
    }
}

impl<S: AssignmentStore + ?Sized + 'static> Optimizer<S> {
    /// Runs [`run_optimization`](Self::run_optimization) on a background
    /// thread. Poll [`progress`](Self::progress) while it runs.
    pub fn spawn(
        self: Arc<Self>,
        override_assignments: bool,
    ) -> JoinHandle<OptimizerResult<OptimizationReport>> {
        std::thread::spawn(move || self.run_optimization(override_assignments))
    }
}

/// Best state seen so far.
#[derive(Debug)]
struct Best {
    state: TrialState,
    score: i64,
    trial: Option<usize>,
}

impl Best {
    fn baseline(state: TrialState) -> Self {
        let score = state.score();
        Self {
            state,
            score,
            trial: None,
        }
    }

    /// Takes the outcome if it scores strictly higher.
    fn offer(&mut self, outcome: TrialOutcome) -> bool {
        if outcome.score > self.score {
            self.score = outcome.score;
            self.trial = Some(outcome.trial_index);
            self.state = outcome.state;
            true
        } else {
            false
        }
    }
}

fn rotation_strategies(seed: Option<u64>) -> Arc<StrategyFactory> {
    Arc::new(move |trial_index: usize| -> Box<dyn PlacementStrategy + Send> {
        match seed {
            Some(seed) => Box::new(RotationStrategy::from_seed(trial_seed(seed, trial_index))),
            None => Box::new(RotationStrategy::from_entropy()),
        }
    })
}

/// Runs and checks one trial. Panics become [`TrialError::Panicked`].
fn run_isolated(
    snapshot: &Snapshot,
    strategies: &StrategyFactory,
    trial_index: usize,
) -> TrialResult<TrialOutcome> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut strategy = strategies(trial_index);
        TrialRunner::new(snapshot).run(&mut *strategy, trial_index)
    }))
    .map_err(|payload| TrialError::Panicked(panic_message(payload.as_ref())))??;

    validate_trial(&outcome.state, snapshot.topics()).map_err(TrialError::Invalid)?;
    Ok(outcome)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
